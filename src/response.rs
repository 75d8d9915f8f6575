use crate::encoder::encode_header;
use crate::status::{self, StatusCategory};

/// レスポンスヘッダー (`<STATUS> <META>\r\n`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    /// 2 桁のステータスコード
    pub status: u8,
    /// meta (MIME タイプ、リダイレクト先、エラーメッセージなど)
    pub meta: String,
}

impl ResponseHeader {
    /// 新しいヘッダーを作成
    pub fn new(status: u8, meta: &str) -> Self {
        Self {
            status,
            meta: meta.to_string(),
        }
    }

    /// ステータスのカテゴリ
    pub fn category(&self) -> Option<StatusCategory> {
        status::category(self.status)
    }

    /// 定義済みのステータスかどうか
    pub fn is_valid_status(&self) -> bool {
        status::is_valid(self.status)
    }

    /// 2x かどうか
    pub fn is_success(&self) -> bool {
        self.category() == Some(StatusCategory::Success)
    }

    /// ヘッダー行をエンコード
    pub fn encode(&self) -> Vec<u8> {
        encode_header(self)
    }
}

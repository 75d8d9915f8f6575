//! Gemini リクエスト行デコーダー

use crate::error::Error;
use crate::limits::DecoderLimits;
use crate::url::RequestUrl;

use super::phase::DecodePhase;
use super::{find_crlf, pending_line_len};

/// リクエスト行デコーダー (Sans I/O)
///
/// サーバー側でクライアントからの `<URL>\r\n` をパースする際に使用。
#[derive(Debug)]
pub struct RequestDecoder {
    buf: Vec<u8>,
    phase: DecodePhase,
    limits: DecoderLimits,
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestDecoder {
    /// 新しいデコーダーを作成
    pub fn new() -> Self {
        Self::with_limits(DecoderLimits::default())
    }

    /// 制限付きでデコーダーを作成
    pub fn with_limits(limits: DecoderLimits) -> Self {
        Self {
            buf: Vec::new(),
            phase: DecodePhase::Line,
            limits,
        }
    }

    /// 制限設定を取得
    pub fn limits(&self) -> &DecoderLimits {
        &self.limits
    }

    /// バッファにデータを追加
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// バッファの残りデータを取得
    pub fn remaining(&self) -> &[u8] {
        &self.buf
    }

    /// リクエスト行をデコード済みかどうか
    pub fn is_complete(&self) -> bool {
        self.phase == DecodePhase::Complete
    }

    /// デコーダーをリセット
    pub fn reset(&mut self) {
        self.buf.clear();
        self.phase = DecodePhase::Line;
    }

    /// リクエスト行をデコード
    ///
    /// 行が揃ったら `Some(RequestUrl)` を返す。データ不足の場合は `None`。
    pub fn decode(&mut self) -> Result<Option<RequestUrl>, Error> {
        if self.phase == DecodePhase::Complete {
            return Err(Error::MalformedRequest(
                "request already decoded".to_string(),
            ));
        }

        let limit = self.limits.max_request_line_length();
        match find_crlf(&self.buf) {
            Some(Ok(end)) => {
                if end > limit {
                    return Err(Error::RequestLineTooLong { size: end, limit });
                }
                let line = std::str::from_utf8(&self.buf[..end])
                    .map_err(|e| Error::MalformedRequest(format!("invalid UTF-8: {e}")))?;
                let url = RequestUrl::parse(line)?;
                self.buf.drain(..end + 2);
                self.phase = DecodePhase::Complete;
                Ok(Some(url))
            }
            Some(Err(())) => Err(Error::MalformedRequest(
                "request line must end with CRLF".to_string(),
            )),
            None => {
                let pending = pending_line_len(&self.buf);
                if pending > limit {
                    return Err(Error::RequestLineTooLong {
                        size: pending,
                        limit,
                    });
                }
                Ok(None)
            }
        }
    }
}

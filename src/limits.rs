/// リクエスト URL の最大長 (バイト)
pub const URL_MAX_LENGTH: usize = 1024;

/// レスポンスヘッダーの meta の最大長 (バイト)
pub const META_MAX_LENGTH: usize = 1024;

/// デコーダーの制限設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderLimits {
    /// リクエスト行の URL 最大長 (デフォルト: 1024 バイト)
    pub max_url_length: usize,
    /// meta の最大長 (デフォルト: 1024 バイト)
    pub max_meta_length: usize,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_url_length: URL_MAX_LENGTH,
            max_meta_length: META_MAX_LENGTH,
        }
    }
}

impl DecoderLimits {
    /// ヘッダー行 (CRLF を除く) の最大長
    ///
    /// ステータス 2 桁 + SP + meta
    pub fn max_header_line_length(&self) -> usize {
        2 + 1 + self.max_meta_length
    }

    /// リクエスト行 (CRLF を除く) の最大長
    pub fn max_request_line_length(&self) -> usize {
        self.max_url_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let limits = DecoderLimits::default();
        assert_eq!(limits.max_url_length, 1024);
        assert_eq!(limits.max_meta_length, 1024);
        assert_eq!(limits.max_header_line_length(), 1027);
        assert_eq!(limits.max_request_line_length(), 1024);
    }
}

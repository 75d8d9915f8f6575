use std::fmt;

use crate::url::UrlError;

/// Gemini ワイヤーフォーマットのパースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// ヘッダー行の形式が不正
    MalformedHeader(String),
    /// meta が長すぎる
    MetaTooLong { size: usize, limit: usize },
    /// リクエスト行の形式が不正
    MalformedRequest(String),
    /// リクエスト行が長すぎる
    RequestLineTooLong { size: usize, limit: usize },
    /// リクエスト URL が不正
    InvalidUrl(UrlError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedHeader(msg) => write!(f, "malformed header: {}", msg),
            Error::MetaTooLong { size, limit } => {
                write!(f, "meta too long: {} > {}", size, limit)
            }
            Error::MalformedRequest(msg) => write!(f, "malformed request: {}", msg),
            Error::RequestLineTooLong { size, limit } => {
                write!(f, "request line too long: {} > {}", size, limit)
            }
            Error::InvalidUrl(e) => write!(f, "invalid URL: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidUrl(e) => Some(e),
            _ => None,
        }
    }
}

impl From<UrlError> for Error {
    fn from(e: UrlError) -> Self {
        Error::InvalidUrl(e)
    }
}

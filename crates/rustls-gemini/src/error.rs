//! rustls-gemini エラー型

use std::fmt;
use std::time::SystemTime;

use shiguredo_gemini::url::UrlError;
use shiguredo_gemini::verify::VerifyError;

use crate::timeout::ConnectionPhase;

/// rustls-gemini エラー
#[derive(Debug)]
pub enum Error {
    /// URL をパースできない
    UrlParse(UrlError),
    /// URL が長すぎる (I/O の前に検出)
    UrlTooLong { size: usize, limit: usize },
    /// ホスト名を解決できない (IDNA 変換、DNS)
    HostResolution(String),
    /// TLS ハンドシェイクに失敗
    TlsHandshake(String),
    /// 証明書がホスト名に一致しない
    HostnameMismatch { host: String },
    /// 証明書の有効期限切れ
    CertificateExpired { not_after: SystemTime },
    /// 証明書がまだ有効になっていない
    CertificateNotYetValid { not_before: SystemTime },
    /// ヘッダー行を読み取れない
    HeaderRead(String),
    /// ヘッダー行の形式が不正
    MalformedHeader(String),
    /// meta が長すぎる
    MetaTooLong { size: usize, limit: usize },
    /// 未定義のステータスコード
    InvalidStatusCode(u8),
    /// ボディの読み取りに失敗
    BodyRead(std::io::Error),
    /// 期限切れ
    Timeout { phase: ConnectionPhase },
    /// クライアント証明書 / 秘密鍵を読み込めない
    ClientCertificate(String),
    /// ピア証明書を解析できない
    Certificate(String),
    /// リクエスト行のデコードに失敗 (サーバー側)
    Gemini(shiguredo_gemini::Error),
    /// I/O エラー
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UrlParse(e) => write!(f, "failed to parse URL: {}", e),
            Error::UrlTooLong { size, limit } => {
                write!(f, "url is too long: {} > {}", size, limit)
            }
            Error::HostResolution(msg) => write!(f, "failed to resolve host: {}", msg),
            Error::TlsHandshake(msg) => write!(f, "TLS handshake error: {}", msg),
            Error::HostnameMismatch { host } => {
                write!(f, "hostname does not verify: {}", host)
            }
            Error::CertificateExpired { .. } => write!(f, "server certificate is expired"),
            Error::CertificateNotYetValid { .. } => {
                write!(f, "server certificate is not valid yet")
            }
            Error::HeaderRead(msg) => write!(f, "failed to read header: {}", msg),
            Error::MalformedHeader(msg) => write!(f, "malformed header: {}", msg),
            Error::MetaTooLong { size, limit } => {
                write!(f, "meta string is too long: {} > {}", size, limit)
            }
            Error::InvalidStatusCode(status) => write!(f, "invalid status code: {}", status),
            Error::BodyRead(e) => write!(f, "failed to read body: {}", e),
            Error::Timeout { phase } => write!(f, "timeout while {}", phase),
            Error::ClientCertificate(msg) => {
                write!(f, "failed to parse cert/key PEM: {}", msg)
            }
            Error::Certificate(msg) => write!(f, "invalid peer certificate: {}", msg),
            Error::Gemini(e) => write!(f, "Gemini error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UrlParse(e) => Some(e),
            Error::BodyRead(e) => Some(e),
            Error::Gemini(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<UrlError> for Error {
    fn from(e: UrlError) -> Self {
        match e {
            UrlError::TooLong { size, limit } => Error::UrlTooLong { size, limit },
            e => Error::UrlParse(e),
        }
    }
}

impl From<shiguredo_gemini::Error> for Error {
    fn from(e: shiguredo_gemini::Error) -> Self {
        match e {
            shiguredo_gemini::Error::MalformedHeader(msg) => Error::MalformedHeader(msg),
            shiguredo_gemini::Error::MetaTooLong { size, limit } => {
                Error::MetaTooLong { size, limit }
            }
            e => Error::Gemini(e),
        }
    }
}

impl From<VerifyError> for Error {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::HostnameMismatch { host } => Error::HostnameMismatch { host },
            VerifyError::Expired { not_after } => Error::CertificateExpired { not_after },
            VerifyError::NotYetValid { not_before } => Error::CertificateNotYetValid { not_before },
        }
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::TlsHandshake(e.to_string())
    }
}

impl Error {
    /// I/O エラーをフェーズに応じて変換する
    ///
    /// 期限切れは [`Error::Timeout`] にまとめる。
    pub(crate) fn from_io(phase: ConnectionPhase, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            return Error::Timeout { phase };
        }
        match phase {
            ConnectionPhase::Connecting | ConnectionPhase::Verifying => {
                Error::TlsHandshake(e.to_string())
            }
            ConnectionPhase::HeaderRead => Error::HeaderRead(e.to_string()),
            ConnectionPhase::StreamingBody => Error::BodyRead(e),
            ConnectionPhase::RequestSent | ConnectionPhase::Closed => Error::Io(e),
        }
    }

    /// タイムアウトかどうか
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn url_error_conversion() {
        let e: Error = UrlError::TooLong {
            size: 1025,
            limit: 1024,
        }
        .into();
        assert!(matches!(e, Error::UrlTooLong { size: 1025, .. }));

        let e: Error = UrlError::UserInfo.into();
        assert!(matches!(e, Error::UrlParse(UrlError::UserInfo)));
    }

    #[test]
    fn io_error_by_phase() {
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "deadline");
        assert!(matches!(
            Error::from_io(ConnectionPhase::HeaderRead, timed_out),
            Error::Timeout {
                phase: ConnectionPhase::HeaderRead
            }
        ));

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(
            Error::from_io(ConnectionPhase::HeaderRead, reset),
            Error::HeaderRead(_)
        ));

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(
            Error::from_io(ConnectionPhase::StreamingBody, reset),
            Error::BodyRead(_)
        ));
    }

    #[test]
    fn codec_error_conversion() {
        let e: Error = shiguredo_gemini::Error::MetaTooLong {
            size: 1025,
            limit: 1024,
        }
        .into();
        assert!(matches!(e, Error::MetaTooLong { size: 1025, .. }));
        assert_eq!(e.to_string(), "meta string is too long: 1025 > 1024");
    }
}

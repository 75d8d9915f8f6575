//! リクエスト URL
//!
//! ## 概要
//!
//! ユーザー入力を絶対 URL に正規化します。
//!
//! - スキーム省略時は `gemini` を補う
//! - userinfo (`user@`) は受け付けない
//! - ポート省略時の接続先は 1965
//! - [`RequestUrl`] はシリアライズ後 1024 バイト以下であることを保証する
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_gemini::url::{RequestUrl, Url};
//!
//! let url = Url::parse("example.com/docs?q=1").unwrap();
//! assert_eq!(url.scheme(), "gemini");
//! assert_eq!(url.host().host(), "example.com");
//! assert_eq!(url.port_or_default(), 1965);
//! assert_eq!(url.to_string(), "gemini://example.com/docs?q=1");
//!
//! let request_url = RequestUrl::parse("gemini://example.com/").unwrap();
//! assert_eq!(request_url.as_str(), "gemini://example.com/");
//! ```

use core::fmt;

use crate::host::{Host, HostError};
use crate::limits::URL_MAX_LENGTH;

/// デフォルトのスキーム
pub const SCHEME: &str = "gemini";

/// デフォルトのポート
pub const DEFAULT_PORT: u16 = 1965;

/// URL パースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// 空の URL
    Empty,
    /// 不正な文字
    InvalidCharacter(char),
    /// 不正なスキーム
    InvalidScheme,
    /// ホストがない
    MissingHost,
    /// userinfo が含まれている
    UserInfo,
    /// 不正なホスト
    InvalidHost,
    /// 不正なポート
    InvalidPort,
    /// URL が長すぎる
    TooLong { size: usize, limit: usize },
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlError::Empty => write!(f, "empty URL"),
            UrlError::InvalidCharacter(c) => write!(f, "invalid character: {:?}", c),
            UrlError::InvalidScheme => write!(f, "invalid scheme"),
            UrlError::MissingHost => write!(f, "URL must have a host"),
            UrlError::UserInfo => write!(f, "userinfo not allowed in URL"),
            UrlError::InvalidHost => write!(f, "invalid host"),
            UrlError::InvalidPort => write!(f, "invalid port"),
            UrlError::TooLong { size, limit } => {
                write!(f, "URL too long: {} > {}", size, limit)
            }
        }
    }
}

impl std::error::Error for UrlError {}

impl From<HostError> for UrlError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::Empty => UrlError::MissingHost,
            HostError::InvalidPort => UrlError::InvalidPort,
            HostError::InvalidFormat | HostError::InvalidHost => UrlError::InvalidHost,
        }
    }
}

/// パース済み URL
///
/// 長さの制限はまだ確認していない。IDNA 変換などでホストを差し替えてから
/// [`RequestUrl`] に変換する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: String,
    host: Host,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Url {
    /// URL 文字列をパース
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        if input.is_empty() {
            return Err(UrlError::Empty);
        }
        if let Some(c) = input.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(UrlError::InvalidCharacter(c));
        }

        // スキームは `scheme://` の形のときだけ認識する
        // `example.com:1965` をスキーム付きと誤認しないため
        let (scheme, rest) = match find_scheme_end(input.as_bytes()) {
            Some(colon) if input[colon + 1..].starts_with("//") => {
                let scheme = &input[..colon];
                if !is_valid_scheme(scheme) {
                    return Err(UrlError::InvalidScheme);
                }
                (scheme.to_ascii_lowercase(), &input[colon + 3..])
            }
            _ => (
                SCHEME.to_string(),
                input.strip_prefix("//").unwrap_or(input),
            ),
        };

        let authority_end = rest
            .find(['/', '?', '#'])
            .unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        if authority.is_empty() {
            return Err(UrlError::MissingHost);
        }
        if authority.contains('@') {
            return Err(UrlError::UserInfo);
        }
        let host = Host::parse(authority)?;

        let rest = &rest[authority_end..];
        let (rest, fragment) = match rest.split_once('#') {
            Some((before, fragment)) => (before, Some(fragment.to_string())),
            None => (rest, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };

        Ok(Url {
            scheme,
            host,
            path: path.to_string(),
            query,
            fragment,
        })
    }

    /// スキームを取得 (小文字)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// ホストを取得
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// 明示されたポート番号
    pub fn port(&self) -> Option<u16> {
        self.host.port()
    }

    /// ポート番号 (省略時は 1965)
    pub fn port_or_default(&self) -> u16 {
        self.host.port_or_default()
    }

    /// パスを取得
    pub fn path(&self) -> &str {
        &self.path
    }

    /// クエリを取得
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// フラグメントを取得
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// ホスト名を差し替える (ポートは維持)
    pub fn set_host(&mut self, host: &str) -> Result<(), UrlError> {
        self.host = self.host.with_host(host)?;
        Ok(())
    }

    /// シリアライズ後のバイト長
    pub fn encoded_len(&self) -> usize {
        self.to_string().len()
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

/// リクエスト行に載せる URL
///
/// 絶対 URL であり、シリアライズ後 1024 バイト以下。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    url: Url,
    serialized: String,
}

impl RequestUrl {
    /// URL 文字列をパースして長さを検証
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        Self::try_from(Url::parse(input)?)
    }

    /// パース済みの URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// シリアライズ済みの URL
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// シリアライズ後のバイト長
    pub fn len(&self) -> usize {
        self.serialized.len()
    }

    /// 空かどうか (常に false)
    pub fn is_empty(&self) -> bool {
        self.serialized.is_empty()
    }

    pub fn into_url(self) -> Url {
        self.url
    }
}

impl TryFrom<Url> for RequestUrl {
    type Error = UrlError;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        let serialized = url.to_string();
        if serialized.len() > URL_MAX_LENGTH {
            return Err(UrlError::TooLong {
                size: serialized.len(),
                limit: URL_MAX_LENGTH,
            });
        }
        Ok(RequestUrl { url, serialized })
    }
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized)
    }
}

/// スキームの終端位置 (`:`) を探す
fn find_scheme_end(bytes: &[u8]) -> Option<usize> {
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' {
            if i > 0 {
                return Some(i);
            }
            return None;
        }
        if !b.is_ascii_alphanumeric() && b != b'+' && b != b'-' && b != b'.' {
            return None;
        }
    }
    None
}

/// scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_valid_scheme(scheme: &str) -> bool {
    let bytes = scheme.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full() {
        let url = Url::parse("gemini://example.com:1966/path/to?q=v#frag").unwrap();
        assert_eq!(url.scheme(), "gemini");
        assert_eq!(url.host().host(), "example.com");
        assert_eq!(url.port(), Some(1966));
        assert_eq!(url.path(), "/path/to");
        assert_eq!(url.query(), Some("q=v"));
        assert_eq!(url.fragment(), Some("frag"));
        assert_eq!(url.to_string(), "gemini://example.com:1966/path/to?q=v#frag");
    }

    #[test]
    fn default_scheme() {
        let url = Url::parse("example.com").unwrap();
        assert_eq!(url.to_string(), "gemini://example.com");
        let url = Url::parse("//example.com/a").unwrap();
        assert_eq!(url.to_string(), "gemini://example.com/a");
        let url = Url::parse("localhost:1965/").unwrap();
        assert_eq!(url.host().host(), "localhost");
        assert_eq!(url.port(), Some(1965));
    }

    #[test]
    fn default_port() {
        let url = Url::parse("gemini://example.com/test//").unwrap();
        assert_eq!(url.port(), None);
        assert_eq!(url.port_or_default(), 1965);
        assert_eq!(url.host().address(), "example.com:1965");
    }

    #[test]
    fn ip_hosts() {
        let url = Url::parse("gemini://[::1]:123/test//").unwrap();
        assert!(url.host().is_ip_literal());
        assert_eq!(url.host().address(), "[::1]:123");
        assert_eq!(url.to_string(), "gemini://[::1]:123/test//");

        let url = Url::parse("gemini://0.0.0.0").unwrap();
        assert_eq!(url.host().address(), "0.0.0.0:1965");
    }

    #[test]
    fn other_scheme_kept() {
        let url = Url::parse("HTTPS://example.com/").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn reject_userinfo() {
        assert_eq!(
            Url::parse("gemini://user@example.com/"),
            Err(UrlError::UserInfo)
        );
    }

    #[test]
    fn reject_invalid() {
        assert_eq!(Url::parse(""), Err(UrlError::Empty));
        assert_eq!(Url::parse("gemini:///path"), Err(UrlError::MissingHost));
        assert_eq!(
            Url::parse("gemini://example.com/a b"),
            Err(UrlError::InvalidCharacter(' '))
        );
        assert_eq!(
            Url::parse("gemini://example.com/\r\n"),
            Err(UrlError::InvalidCharacter('\r'))
        );
        assert_eq!(Url::parse("gemini://example.com:x/"), Err(UrlError::InvalidPort));
        assert_eq!(Url::parse("1http://example.com/"), Err(UrlError::InvalidScheme));
    }

    #[test]
    fn set_host_keeps_port() {
        let mut url = Url::parse("gemini://münchen.example:1966/").unwrap();
        url.set_host("xn--mnchen-3ya.example").unwrap();
        assert_eq!(url.to_string(), "gemini://xn--mnchen-3ya.example:1966/");
    }

    #[test]
    fn request_url_length_boundary() {
        let prefix = "gemini://example.com/";
        let ok = format!("{}{}", prefix, "a".repeat(URL_MAX_LENGTH - prefix.len()));
        assert_eq!(RequestUrl::parse(&ok).unwrap().len(), 1024);

        let too_long = format!("{}{}", prefix, "a".repeat(URL_MAX_LENGTH + 1 - prefix.len()));
        assert_eq!(
            RequestUrl::parse(&too_long),
            Err(UrlError::TooLong {
                size: 1025,
                limit: 1024
            })
        );
    }
}

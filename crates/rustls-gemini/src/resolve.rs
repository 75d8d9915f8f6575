//! 接続先の解決 (IDNA)
//!
//! リクエスト URL のホストは ASCII (punycode) に変換してから長さを確認する。
//! 接続先のホストは変換前の表記も保持し、証明書の検証では ASCII 形式と
//! Unicode 形式の両方を試す。

use shiguredo_gemini::host::{Host, join_host_port};
use shiguredo_gemini::url::{RequestUrl, Url};

use crate::error::{Error, Result};

/// ホスト名を ASCII 形式に変換する
///
/// IP アドレスはそのまま返す。
pub fn to_ascii_host(host: &str) -> Result<String> {
    if shiguredo_gemini::host::parse_ip_literal(host).is_some() {
        return Ok(host.to_string());
    }
    idna::domain_to_ascii(host)
        .map_err(|e| Error::HostResolution(format!("failed to punycode host {}: {}", host, e)))
}

/// ホスト名を Unicode 形式に変換する
///
/// 変換できないラベルを含む場合は `None`。
pub fn to_unicode_host(host: &str) -> Option<String> {
    let (unicode, result) = idna::domain_to_unicode(host);
    result.ok().map(|_| unicode)
}

/// URL のホストを ASCII 形式に変換し、長さを確認したリクエスト URL を返す
///
/// 長さは変換後の URL で確認する。
pub fn punycode_url(raw: &str) -> Result<RequestUrl> {
    let mut url = Url::parse(raw)?;
    if !url.host().is_ip_literal() {
        let ascii = to_ascii_host(url.host().host())?;
        url.set_host(&ascii)?;
    }
    Ok(RequestUrl::try_from(url)?)
}

/// 接続先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// 記述されたままのホスト名
    host: String,
    /// 接続に使う ASCII 形式のホスト名
    ascii_host: String,
    port: u16,
    is_ip: bool,
}

impl Target {
    /// リクエスト URL のホストへ接続する
    pub fn for_url(url: &Url) -> Result<Self> {
        Self::from_host(url.host())
    }

    /// URL とは別のホストへ接続する (`host[:port]`、ポート省略時は 1965)
    pub fn for_host(host: &str) -> Result<Self> {
        let host = Host::parse(host).map_err(|e| Error::HostResolution(e.to_string()))?;
        Self::from_host(&host)
    }

    fn from_host(host: &Host) -> Result<Self> {
        let ascii_host = to_ascii_host(host.host())?;
        Ok(Self {
            host: host.host().to_string(),
            ascii_host,
            port: host.port_or_default(),
            is_ip: host.is_ip_literal(),
        })
    }

    /// 記述されたままのホスト名
    pub fn host(&self) -> &str {
        &self.host
    }

    /// ASCII 形式のホスト名
    pub fn ascii_host(&self) -> &str {
        &self.ascii_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_ip(&self) -> bool {
        self.is_ip
    }

    /// 接続用アドレス (`host:port`)
    pub fn address(&self) -> String {
        join_host_port(&self.ascii_host, self.port)
    }

    /// 証明書の検証で試すホスト名
    ///
    /// ASCII 形式、Unicode 形式の順。重複は除く。
    pub fn identity_hosts(&self) -> Vec<String> {
        let mut hosts = vec![self.ascii_host.clone()];
        if !self.is_ip {
            if let Some(unicode) = to_unicode_host(&self.ascii_host) {
                if !hosts.contains(&unicode) {
                    hosts.push(unicode);
                }
            }
        }
        hosts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_host() {
        assert_eq!(to_ascii_host("example.com").unwrap(), "example.com");
        assert_eq!(
            to_ascii_host("münchen.example").unwrap(),
            "xn--mnchen-3ya.example"
        );
        assert_eq!(to_ascii_host("::1").unwrap(), "::1");
        assert_eq!(to_ascii_host("127.0.0.1").unwrap(), "127.0.0.1");
    }

    #[test]
    fn unicode_host() {
        assert_eq!(
            to_unicode_host("xn--mnchen-3ya.example").as_deref(),
            Some("münchen.example")
        );
        assert_eq!(to_unicode_host("example.com").as_deref(), Some("example.com"));
    }

    #[test]
    fn punycode_request_url() {
        let url = punycode_url("gemini://münchen.example:1966/ä").unwrap();
        assert_eq!(url.as_str(), "gemini://xn--mnchen-3ya.example:1966/ä");

        let url = punycode_url("example.com").unwrap();
        assert_eq!(url.as_str(), "gemini://example.com");

        let url = punycode_url("gemini://[::1]/").unwrap();
        assert_eq!(url.as_str(), "gemini://[::1]/");
    }

    #[test]
    fn url_too_long() {
        let prefix = "gemini://example.com/";
        let raw = format!("{}{}", prefix, "a".repeat(1025 - prefix.len()));
        assert!(matches!(
            punycode_url(&raw),
            Err(Error::UrlTooLong {
                size: 1025,
                limit: 1024
            })
        ));
    }

    #[test]
    fn length_checked_after_punycode() {
        // Unicode のままなら 1024 バイト以下だが、変換後は超える
        let host = format!("{}ü", "a".repeat(40));
        let prefix = format!("gemini://{}.example/", host);
        let raw = format!("{}{}", prefix, "a".repeat(1024 - prefix.len()));
        assert_eq!(raw.len(), 1024);
        assert!(matches!(punycode_url(&raw), Err(Error::UrlTooLong { .. })));
    }

    #[test]
    fn userinfo_rejected() {
        assert!(matches!(
            punycode_url("gemini://user@example.com/"),
            Err(Error::UrlParse(_))
        ));
    }

    #[test]
    fn target() {
        let url = Url::parse("gemini://münchen.example/").unwrap();
        let target = Target::for_url(&url).unwrap();
        assert_eq!(target.host(), "münchen.example");
        assert_eq!(target.ascii_host(), "xn--mnchen-3ya.example");
        assert_eq!(target.port(), 1965);
        assert_eq!(target.address(), "xn--mnchen-3ya.example:1965");
        assert_eq!(
            target.identity_hosts(),
            vec![
                "xn--mnchen-3ya.example".to_string(),
                "münchen.example".to_string()
            ]
        );

        let target = Target::for_host("[::1]:1966").unwrap();
        assert!(target.is_ip());
        assert_eq!(target.address(), "[::1]:1966");
        assert_eq!(target.identity_hosts(), vec!["::1".to_string()]);

        let target = Target::for_host("localhost").unwrap();
        assert_eq!(target.address(), "localhost:1965");
        assert_eq!(target.identity_hosts(), vec!["localhost".to_string()]);
    }
}

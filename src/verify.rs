//! サーバー証明書の検証 (RFC 6125)
//!
//! ## 概要
//!
//! Gemini では自己署名証明書が一般的なため、証明書チェーンは検証しません。
//! 代わりにリーフ証明書に対して次の 2 つを独立に確認します。
//!
//! - ホスト名: SAN の DNS 名 / IP アドレスとの照合。左端ラベルのワイルドカードに対応。
//!   SAN 拡張がなく、Common Name がホスト名として妥当な場合のみ Common Name を使う。
//! - 有効期間: NotBefore / NotAfter
//!
//! 検証は純粋関数で、TLS 実装には依存しません。証明書は
//! [`CertificateIdentity`] を実装していればよい。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_gemini::verify::{verify_hostname, CertificateInfo};
//!
//! let cert = CertificateInfo {
//!     dns_names: vec!["*.example.com".to_string()],
//!     has_san_extension: true,
//!     ..CertificateInfo::default()
//! };
//! assert!(verify_hostname(&cert, "www.example.com").is_ok());
//! assert!(verify_hostname(&cert, "example.com").is_err());
//! ```

use core::fmt;
use std::net::IpAddr;
use std::time::SystemTime;

use crate::host::parse_ip_literal;

/// 検証に必要な証明書の情報
pub trait CertificateIdentity {
    /// SAN の DNS 名
    fn dns_names(&self) -> &[String];
    /// SAN の IP アドレス
    fn ip_addresses(&self) -> &[IpAddr];
    /// Subject の Common Name (ない場合は空文字列)
    fn common_name(&self) -> &str;
    fn not_before(&self) -> SystemTime;
    fn not_after(&self) -> SystemTime;
    /// SAN 拡張が存在するか
    fn has_san_extension(&self) -> bool;
}

/// 証明書情報のスナップショット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub common_name: String,
    pub not_before: SystemTime,
    pub not_after: SystemTime,
    pub has_san_extension: bool,
}

impl Default for CertificateInfo {
    fn default() -> Self {
        Self {
            dns_names: Vec::new(),
            ip_addresses: Vec::new(),
            common_name: String::new(),
            not_before: SystemTime::UNIX_EPOCH,
            not_after: SystemTime::UNIX_EPOCH,
            has_san_extension: false,
        }
    }
}

impl CertificateIdentity for CertificateInfo {
    fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }

    fn common_name(&self) -> &str {
        &self.common_name
    }

    fn not_before(&self) -> SystemTime {
        self.not_before
    }

    fn not_after(&self) -> SystemTime {
        self.not_after
    }

    fn has_san_extension(&self) -> bool {
        self.has_san_extension
    }
}

/// 検証に失敗した項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyField {
    Hostname,
    Validity,
}

impl fmt::Display for VerifyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyField::Hostname => write!(f, "hostname"),
            VerifyField::Validity => write!(f, "validity"),
        }
    }
}

/// 証明書検証エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// ホスト名が一致しない
    HostnameMismatch { host: String },
    /// 有効期限切れ
    Expired { not_after: SystemTime },
    /// まだ有効期間が始まっていない
    NotYetValid { not_before: SystemTime },
}

impl VerifyError {
    /// 失敗した項目
    pub fn field(&self) -> VerifyField {
        match self {
            VerifyError::HostnameMismatch { .. } => VerifyField::Hostname,
            VerifyError::Expired { .. } | VerifyError::NotYetValid { .. } => VerifyField::Validity,
        }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::HostnameMismatch { host } => {
                write!(f, "hostname: certificate is not valid for {}", host)
            }
            VerifyError::Expired { .. } => write!(f, "validity: certificate is expired"),
            VerifyError::NotYetValid { .. } => {
                write!(f, "validity: certificate is not yet valid")
            }
        }
    }
}

impl std::error::Error for VerifyError {}

/// 検証項目の切り替え
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// ホスト名を確認する
    pub check_hostname: bool,
    /// 有効期間を確認する
    pub check_validity: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            check_hostname: true,
            check_validity: true,
        }
    }
}

impl VerifyOptions {
    /// すべての確認を無効にする
    pub fn insecure() -> Self {
        Self {
            check_hostname: false,
            check_validity: false,
        }
    }
}

/// ホスト名と有効期間をまとめて検証する
///
/// ホスト名を先に確認する。
pub fn verify<C: CertificateIdentity + ?Sized>(
    cert: &C,
    host: &str,
    options: &VerifyOptions,
    now: SystemTime,
) -> Result<(), VerifyError> {
    if options.check_hostname {
        verify_hostname(cert, host)?;
    }
    if options.check_validity {
        verify_validity(cert, now)?;
    }
    Ok(())
}

/// 証明書の有効期間を検証する
pub fn verify_validity<C: CertificateIdentity + ?Sized>(
    cert: &C,
    now: SystemTime,
) -> Result<(), VerifyError> {
    if now < cert.not_before() {
        return Err(VerifyError::NotYetValid {
            not_before: cert.not_before(),
        });
    }
    if now > cert.not_after() {
        return Err(VerifyError::Expired {
            not_after: cert.not_after(),
        });
    }
    Ok(())
}

/// 証明書が `host` に対して有効か検証する
///
/// IP アドレス (`[...]` で囲んでもよい) は SAN の IP アドレスとだけ照合する。
/// それ以外は DNS 名と大文字小文字を区別せずに照合する。どちらもホスト名として
/// 妥当な場合に限り、左端ラベルのワイルドカードと末尾のドットを扱う。
pub fn verify_hostname<C: CertificateIdentity + ?Sized>(
    cert: &C,
    host: &str,
) -> Result<(), VerifyError> {
    if let Some(ip) = parse_ip_literal(host) {
        // IP アドレスは DNS 名とは照合しない (RFC 6125 Appendix B.2)
        let ip = canonical_ip(ip);
        if cert
            .ip_addresses()
            .iter()
            .any(|&candidate| canonical_ip(candidate) == ip)
        {
            return Ok(());
        }
        return Err(VerifyError::HostnameMismatch {
            host: ip.to_string(),
        });
    }

    let common_name;
    let names: &[String] = if common_name_as_hostname(cert) {
        common_name = [cert.common_name().to_string()];
        &common_name
    } else {
        cert.dns_names()
    };

    let candidate = to_lower_case_ascii(host);
    let valid_candidate = valid_hostname_input(&candidate);

    for name in names {
        // ワイルドカードと末尾のドットは、両方が妥当なホスト名のときだけ扱う
        let matched = if valid_candidate && valid_hostname_pattern(name) {
            match_hostnames(name, &candidate)
        } else {
            match_exactly(name, &candidate)
        };
        if matched {
            return Ok(());
        }
    }

    Err(VerifyError::HostnameMismatch {
        host: host.to_string(),
    })
}

/// Common Name をホスト名として扱うか
///
/// SAN 拡張がなく、Common Name がホスト名として妥当な場合のみ。
fn common_name_as_hostname<C: CertificateIdentity + ?Sized>(cert: &C) -> bool {
    !cert.has_san_extension() && valid_hostname_pattern(cert.common_name())
}

/// IPv4-mapped IPv6 を IPv4 として扱う
fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}

/// 照合パターンとして妥当なホスト名か (左端の `*` を許可)
pub fn valid_hostname_pattern(host: &str) -> bool {
    valid_hostname(host, true)
}

/// 照合対象として妥当なホスト名か (末尾のドットを 1 つ許可)
pub fn valid_hostname_input(host: &str) -> bool {
    valid_hostname(host, false)
}

fn valid_hostname(host: &str, is_pattern: bool) -> bool {
    let host = if is_pattern {
        host
    } else {
        host.strip_suffix('.').unwrap_or(host)
    };
    if host.is_empty() {
        return false;
    }

    for (i, label) in host.split('.').enumerate() {
        if label.is_empty() {
            return false;
        }
        if is_pattern && i == 0 && label == "*" {
            continue;
        }
        for (j, b) in label.bytes().enumerate() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => {}
                b'-' if j != 0 => {}
                // ホスト名としては不正だが WebPKI 以外では広く使われている
                b'_' => {}
                _ => return false,
            }
        }
    }

    true
}

fn match_exactly(a: &str, b: &str) -> bool {
    if a.is_empty() || a == "." || b.is_empty() || b == "." {
        return false;
    }
    to_lower_case_ascii(a) == to_lower_case_ascii(b)
}

fn match_hostnames(pattern: &str, host: &str) -> bool {
    let pattern = to_lower_case_ascii(pattern);
    let host = to_lower_case_ascii(host.strip_suffix('.').unwrap_or(host));

    if pattern.is_empty() || host.is_empty() {
        return false;
    }

    let pattern_labels: Vec<&str> = pattern.split('.').collect();
    let host_labels: Vec<&str> = host.split('.').collect();

    if pattern_labels.len() != host_labels.len() {
        return false;
    }

    pattern_labels
        .iter()
        .zip(&host_labels)
        .enumerate()
        .all(|(i, (p, h))| (i == 0 && *p == "*") || p == h)
}

/// ASCII のみの小文字化 (RFC 6125 6.4.1)
///
/// Unicode の大文字小文字変換はラベルに対して行わない。
pub fn to_lower_case_ascii(input: &str) -> String {
    input.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn san_cert(dns_names: &[&str]) -> CertificateInfo {
        CertificateInfo {
            dns_names: dns_names.iter().map(|s| s.to_string()).collect(),
            has_san_extension: true,
            ..CertificateInfo::default()
        }
    }

    fn cn_cert(common_name: &str) -> CertificateInfo {
        CertificateInfo {
            common_name: common_name.to_string(),
            ..CertificateInfo::default()
        }
    }

    #[test]
    fn wildcard_matches_one_label() {
        let cert = san_cert(&["*.example.com"]);
        assert!(verify_hostname(&cert, "www.example.com").is_ok());
        assert!(verify_hostname(&cert, "WWW.Example.COM").is_ok());
        assert!(verify_hostname(&cert, "www.example.com.").is_ok());
        assert!(verify_hostname(&cert, "example.com").is_err());
        assert!(verify_hostname(&cert, "a.b.example.com").is_err());
    }

    #[test]
    fn wildcard_only_leftmost() {
        let cert = san_cert(&["www.*.com"]);
        assert!(verify_hostname(&cert, "www.example.com").is_err());
        // 不正なパターンは完全一致でのみ照合する
        assert!(verify_hostname(&cert, "www.*.com").is_ok());
    }

    #[test]
    fn partial_wildcard_is_literal() {
        let cert = san_cert(&["w*.example.com"]);
        assert!(verify_hostname(&cert, "www.example.com").is_err());
    }

    #[test]
    fn exact_names() {
        let cert = san_cert(&["example.com", "other.example"]);
        assert!(verify_hostname(&cert, "example.com").is_ok());
        assert!(verify_hostname(&cert, "other.example").is_ok());
        assert!(verify_hostname(&cert, "www.example.com").is_err());
    }

    #[test]
    fn trailing_dot_stripped_from_host_only() {
        let cert = san_cert(&["example.com."]);
        // パターン側の末尾ドットは除去しない
        assert!(verify_hostname(&cert, "example.com").is_err());
        assert!(verify_hostname(&cert, "example.com.").is_ok());
    }

    #[test]
    fn invalid_host_uses_exact_match() {
        let cert = san_cert(&["exa mple.com"]);
        assert!(verify_hostname(&cert, "EXA MPLE.com").is_ok());
        assert!(verify_hostname(&cert, "exa mple.org").is_err());
    }

    #[test]
    fn empty_and_dot_never_match() {
        let cert = san_cert(&["", "."]);
        assert!(verify_hostname(&cert, "").is_err());
        assert!(verify_hostname(&cert, ".").is_err());
    }

    #[test]
    fn wildcard_host_is_not_a_pattern() {
        let cert = san_cert(&["*.example.com"]);
        // ホスト側の `*` はワイルドカードとして扱わず、完全一致で照合する
        assert!(verify_hostname(&cert, "*.example.com").is_ok());
        let cert = san_cert(&["www.example.com"]);
        assert!(verify_hostname(&cert, "*.example.com").is_err());
    }

    #[test]
    fn underscore_allowed() {
        let cert = san_cert(&["*.my_host.example"]);
        assert!(verify_hostname(&cert, "a.my_host.example").is_ok());
    }

    #[test]
    fn leading_hyphen_is_invalid_label() {
        assert!(!valid_hostname_input("-a.example.com"));
        assert!(valid_hostname_input("a-.example.com"));
        assert!(!valid_hostname_input("a..example.com"));
        assert!(valid_hostname_input("example.com."));
        assert!(!valid_hostname_input("example.com.."));
        assert!(!valid_hostname_pattern("example.com."));
        assert!(!valid_hostname_input("*.example.com"));
        assert!(valid_hostname_pattern("*.example.com"));
        assert!(!valid_hostname_pattern("a.*.example.com"));
        assert!(!valid_hostname_input("münchen.example"));
    }

    #[test]
    fn common_name_fallback_without_san() {
        let cert = cn_cert("example.com");
        assert!(verify_hostname(&cert, "example.com").is_ok());
        assert!(verify_hostname(&cert, "www.example.com").is_err());
    }

    #[test]
    fn common_name_ignored_with_san() {
        let cert = CertificateInfo {
            common_name: "example.com".to_string(),
            dns_names: vec!["unrelated.example".to_string()],
            has_san_extension: true,
            ..CertificateInfo::default()
        };
        assert!(verify_hostname(&cert, "example.com").is_err());
        assert!(verify_hostname(&cert, "unrelated.example").is_ok());
    }

    #[test]
    fn common_name_ignored_with_empty_san() {
        let cert = CertificateInfo {
            common_name: "example.com".to_string(),
            has_san_extension: true,
            ..CertificateInfo::default()
        };
        assert!(verify_hostname(&cert, "example.com").is_err());
    }

    #[test]
    fn invalid_common_name_ignored() {
        let cert = cn_cert("My Test Server");
        assert!(verify_hostname(&cert, "My Test Server").is_err());
    }

    #[test]
    fn wildcard_common_name() {
        let cert = cn_cert("*.example.com");
        assert!(verify_hostname(&cert, "gemini.example.com").is_ok());
    }

    #[test]
    fn ip_addresses() {
        let cert = CertificateInfo {
            ip_addresses: vec!["127.0.0.1".parse().unwrap(), "::1".parse().unwrap()],
            dns_names: vec!["127.0.0.2".to_string()],
            has_san_extension: true,
            ..CertificateInfo::default()
        };
        assert!(verify_hostname(&cert, "127.0.0.1").is_ok());
        assert!(verify_hostname(&cert, "::1").is_ok());
        assert!(verify_hostname(&cert, "[::1]").is_ok());
        assert!(verify_hostname(&cert, "::ffff:127.0.0.1").is_ok());
        // IP アドレスは DNS 名とは照合しない
        assert!(verify_hostname(&cert, "127.0.0.2").is_err());
    }

    #[test]
    fn ip_never_matches_common_name() {
        let cert = cn_cert("127.0.0.1");
        assert!(verify_hostname(&cert, "127.0.0.1").is_err());
    }

    #[test]
    fn mismatch_names_field() {
        let cert = san_cert(&["example.com"]);
        let err = verify_hostname(&cert, "example.org").unwrap_err();
        assert_eq!(err.field(), VerifyField::Hostname);
        assert_eq!(
            err.to_string(),
            "hostname: certificate is not valid for example.org"
        );
    }

    #[test]
    fn validity_window() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let end = start + Duration::from_secs(3600);
        let cert = CertificateInfo {
            not_before: start,
            not_after: end,
            ..CertificateInfo::default()
        };

        assert!(verify_validity(&cert, start).is_ok());
        assert!(verify_validity(&cert, end).is_ok());
        assert!(verify_validity(&cert, start + Duration::from_secs(1)).is_ok());

        let err = verify_validity(&cert, start - Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, VerifyError::NotYetValid { .. }));
        assert_eq!(err.field(), VerifyField::Validity);

        let err = verify_validity(&cert, end + Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, VerifyError::Expired { .. }));
    }

    #[test]
    fn verify_toggles() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let cert = CertificateInfo {
            dns_names: vec!["example.com".to_string()],
            has_san_extension: true,
            not_before: start,
            not_after: start + Duration::from_secs(10),
            ..CertificateInfo::default()
        };
        let expired = start + Duration::from_secs(100);

        let err = verify(&cert, "example.org", &VerifyOptions::default(), expired).unwrap_err();
        assert_eq!(err.field(), VerifyField::Hostname);

        let options = VerifyOptions {
            check_hostname: false,
            check_validity: true,
        };
        let err = verify(&cert, "example.org", &options, expired).unwrap_err();
        assert!(matches!(err, VerifyError::Expired { .. }));

        let options = VerifyOptions {
            check_hostname: true,
            check_validity: false,
        };
        assert!(verify(&cert, "example.com", &options, expired).is_ok());

        assert!(verify(&cert, "example.org", &VerifyOptions::insecure(), expired).is_ok());
    }
}

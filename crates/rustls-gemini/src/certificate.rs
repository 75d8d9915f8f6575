//! ピア証明書

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rustls_pki_types::CertificateDer;
use shiguredo_gemini::verify::{CertificateIdentity, CertificateInfo};
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::oid_registry::OID_X509_EXT_SUBJECT_ALT_NAME;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::{Error, Result};

/// ピアのリーフ証明書
///
/// DER と、検証に使う情報のスナップショットを持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate {
    der: CertificateDer<'static>,
    info: CertificateInfo,
}

impl PeerCertificate {
    /// DER から作成
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::Certificate(e.to_string()))?;

        let mut info = CertificateInfo {
            not_before: to_system_time(cert.validity().not_before.timestamp()),
            not_after: to_system_time(cert.validity().not_after.timestamp()),
            ..CertificateInfo::default()
        };

        // Common Name が複数あれば最後のものを使う
        if let Some(cn) = cert.subject().iter_common_name().last() {
            // 文字列として読めない Common Name は無いものとして扱う
            info.common_name = cn.as_str().unwrap_or_default().to_string();
        }

        for extension in cert.extensions() {
            if extension.oid != OID_X509_EXT_SUBJECT_ALT_NAME {
                continue;
            }
            info.has_san_extension = true;
            if let ParsedExtension::SubjectAlternativeName(san) = extension.parsed_extension() {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => info.dns_names.push(dns.to_string()),
                        GeneralName::IPAddress(bytes) => {
                            if let Some(ip) = ip_from_bytes(bytes) {
                                info.ip_addresses.push(ip);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(Self {
            der: CertificateDer::from(der.to_vec()),
            info,
        })
    }

    /// DER 形式の証明書
    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    /// 検証に使う情報
    pub fn info(&self) -> &CertificateInfo {
        &self.info
    }
}

impl CertificateIdentity for PeerCertificate {
    fn dns_names(&self) -> &[String] {
        &self.info.dns_names
    }

    fn ip_addresses(&self) -> &[IpAddr] {
        &self.info.ip_addresses
    }

    fn common_name(&self) -> &str {
        &self.info.common_name
    }

    fn not_before(&self) -> SystemTime {
        self.info.not_before
    }

    fn not_after(&self) -> SystemTime {
        self.info.not_after
    }

    fn has_san_extension(&self) -> bool {
        self.info.has_san_extension
    }
}

fn to_system_time(timestamp: i64) -> SystemTime {
    if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(timestamp.unsigned_abs())
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Some(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, date_time_ymd};
    use shiguredo_gemini::verify::{VerifyError, verify_hostname, verify_validity};

    #[test]
    fn san_names_and_addresses() {
        let names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        let certified = rcgen::generate_simple_self_signed(names).unwrap();
        let peer = PeerCertificate::from_der(certified.cert.der()).unwrap();

        assert!(peer.has_san_extension());
        assert_eq!(peer.dns_names(), ["localhost".to_string()]);
        assert_eq!(peer.ip_addresses(), [IpAddr::V4(Ipv4Addr::LOCALHOST)]);
        assert_eq!(peer.der().as_ref(), certified.cert.der().as_ref());

        assert!(verify_hostname(&peer, "localhost").is_ok());
        assert!(verify_hostname(&peer, "127.0.0.1").is_ok());
        assert!(verify_hostname(&peer, "example.com").is_err());
        assert!(verify_validity(&peer, SystemTime::now()).is_ok());
    }

    #[test]
    fn common_name_without_san() {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "example.com");
        params.distinguished_name = dn;
        let key_pair = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        let peer = PeerCertificate::from_der(cert.der()).unwrap();
        assert!(!peer.has_san_extension());
        assert_eq!(peer.common_name(), "example.com");
        assert!(verify_hostname(&peer, "example.com").is_ok());
    }

    #[test]
    fn last_common_name_wins() {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "first.example.com");
        // 同じ OID の 2 つ目の CN
        dn.push(DnType::CustomDnType(vec![2, 5, 4, 3]), "last.example.com");
        params.distinguished_name = dn;
        let key_pair = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        let peer = PeerCertificate::from_der(cert.der()).unwrap();
        assert_eq!(peer.common_name(), "last.example.com");
        assert!(verify_hostname(&peer, "last.example.com").is_ok());
        assert!(verify_hostname(&peer, "first.example.com").is_err());
    }

    #[test]
    fn validity_window() {
        let mut params = CertificateParams::new(vec!["example.com".to_string()]).unwrap();
        params.not_before = date_time_ymd(2000, 1, 1);
        params.not_after = date_time_ymd(2001, 1, 1);
        let key_pair = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        let peer = PeerCertificate::from_der(cert.der()).unwrap();
        assert_eq!(
            peer.not_before(),
            UNIX_EPOCH + Duration::from_secs(946_684_800)
        );
        assert!(matches!(
            verify_validity(&peer, SystemTime::now()),
            Err(VerifyError::Expired { .. })
        ));
    }

    #[test]
    fn garbage() {
        assert!(matches!(
            PeerCertificate::from_der(b"not a certificate"),
            Err(Error::Certificate(_))
        ));
    }

    #[test]
    fn ip_bytes() {
        assert_eq!(
            ip_from_bytes(&[10, 0, 0, 1]),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(
            ip_from_bytes(&Ipv6Addr::LOCALHOST.octets()),
            Some(IpAddr::V6(Ipv6Addr::LOCALHOST))
        );
        assert_eq!(ip_from_bytes(&[1, 2, 3]), None);
    }
}

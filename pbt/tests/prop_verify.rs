//! ホスト名検証のプロパティテスト (verify.rs)

use std::time::{Duration, SystemTime};

use pbt::{hostname, hostname_label};
use proptest::prelude::*;
use shiguredo_gemini::verify::{
    CertificateInfo, VerifyError, VerifyOptions, to_lower_case_ascii, verify, verify_hostname,
    verify_validity,
};

fn san_cert(names: &[String]) -> CertificateInfo {
    CertificateInfo {
        dns_names: names.to_vec(),
        has_san_extension: true,
        ..CertificateInfo::default()
    }
}

// ========================================
// 完全一致
// ========================================

proptest! {
    #[test]
    fn exact_name_matches_itself(host in hostname(4)) {
        let cert = san_cert(&[host.clone()]);
        prop_assert!(verify_hostname(&cert, &host).is_ok());
    }

    #[test]
    fn exact_name_is_case_insensitive(host in hostname(4)) {
        let cert = san_cert(&[host.clone()]);
        prop_assert!(verify_hostname(&cert, &host.to_ascii_uppercase()).is_ok());
    }

    #[test]
    fn trailing_dot_on_host_is_ignored(host in hostname(4)) {
        let cert = san_cert(&[host.clone()]);
        prop_assert!(verify_hostname(&cert, &format!("{}.", host)).is_ok(), "trailing dot host should match");
    }

    #[test]
    fn different_name_does_not_match(host in hostname(3), label in hostname_label()) {
        let cert = san_cert(&[host.clone()]);
        let other = format!("{}.{}", label, host);
        prop_assert!(
            matches!(verify_hostname(&cert, &other), Err(VerifyError::HostnameMismatch { .. })),
            "expected HostnameMismatch"
        );
    }
}

// ========================================
// ワイルドカード
// ========================================

proptest! {
    #[test]
    fn wildcard_matches_exactly_one_label(
        base in hostname(3),
        first in hostname_label(),
        second in hostname_label(),
    ) {
        let cert = san_cert(&[format!("*.{}", base)]);

        prop_assert!(verify_hostname(&cert, &format!("{}.{}", first, base)).is_ok(), "wildcard should match one label");
        // ワイルドカードは空のラベルにも複数のラベルにも一致しない
        prop_assert!(verify_hostname(&cert, &base).is_err());
        prop_assert!(verify_hostname(&cert, &format!("{}.{}.{}", first, second, base)).is_err(), "wildcard should not match two labels");
    }

    #[test]
    fn wildcard_not_leftmost_never_matches_other_names(
        left in hostname_label(),
        middle in hostname_label(),
        right in hostname_label(),
    ) {
        let cert = san_cert(&[format!("{}.*.{}", left, right)]);
        let host = format!("{}.{}.{}", left, middle, right);
        prop_assert!(verify_hostname(&cert, &host).is_err());
    }
}

// ========================================
// Common Name へのフォールバック
// ========================================

proptest! {
    #[test]
    fn common_name_used_without_san(host in hostname(4)) {
        let cert = CertificateInfo {
            common_name: host.clone(),
            ..CertificateInfo::default()
        };
        prop_assert!(verify_hostname(&cert, &host).is_ok());
    }

    #[test]
    fn common_name_ignored_with_san(host in hostname(4), other in hostname(2)) {
        prop_assume!(to_lower_case_ascii(&host) != to_lower_case_ascii(&other));
        let cert = CertificateInfo {
            dns_names: vec![other],
            common_name: host.clone(),
            has_san_extension: true,
            ..CertificateInfo::default()
        };
        prop_assert!(verify_hostname(&cert, &host).is_err());
    }
}

// ========================================
// 有効期間
// ========================================

proptest! {
    #[test]
    fn validity_window(offset in 0u64..1_000_000, length in 1u64..1_000_000) {
        let not_before = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000 + offset);
        let not_after = not_before + Duration::from_secs(length);
        let cert = CertificateInfo {
            not_before,
            not_after,
            ..CertificateInfo::default()
        };

        prop_assert!(verify_validity(&cert, not_before).is_ok());
        prop_assert!(verify_validity(&cert, not_after).is_ok());
        prop_assert!(matches!(
            verify_validity(&cert, not_before - Duration::from_secs(1)),
            Err(VerifyError::NotYetValid { .. })
        ), "expected NotYetValid");
        prop_assert!(matches!(
            verify_validity(&cert, not_after + Duration::from_secs(1)),
            Err(VerifyError::Expired { .. })
        ), "expected Expired");
    }

    #[test]
    fn insecure_accepts_anything(host in hostname(3), other in hostname(3)) {
        let cert = san_cert(&[other]);
        let far_future = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000_000_000);
        prop_assert!(verify(&cert, &host, &VerifyOptions::insecure(), far_future).is_ok());
    }
}

//! ステータスコードのプロパティテスト (status.rs)

use proptest::prelude::*;
use shiguredo_gemini::status::{self, StatusCategory};

proptest! {
    #[test]
    fn category_follows_first_digit(code in 0u8..=255) {
        let category = status::category(code);
        if (10..=69).contains(&code) {
            let category = category.unwrap();
            prop_assert_eq!(category.code(), status::simplify_status(code));
        } else {
            prop_assert_eq!(category, None);
        }
    }

    #[test]
    fn defined_status_has_category(code in 0u8..=255) {
        if status::is_valid(code) {
            prop_assert!(status::category(code).is_some());
        }
    }

    #[test]
    fn simplify_is_idempotent(code in 10u8..=69) {
        let simplified = status::simplify_status(code);
        prop_assert_eq!(status::simplify_status(simplified), simplified);
        prop_assert!(simplified <= code);
        prop_assert_eq!(simplified % 10, 0);
    }
}

#[test]
fn category_codes() {
    assert_eq!(StatusCategory::Input.code(), 10);
    assert_eq!(StatusCategory::Success.code(), 20);
    assert_eq!(StatusCategory::Redirect.code(), 30);
    assert_eq!(StatusCategory::TemporaryFailure.code(), 40);
    assert_eq!(StatusCategory::PermanentFailure.code(), 50);
    assert_eq!(StatusCategory::ClientCertificateRequired.code(), 60);
}

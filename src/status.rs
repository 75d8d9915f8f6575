//! ステータスコード
//!
//! ## 概要
//!
//! Gemini のステータスコードは 2 桁の整数で、上位桁がカテゴリを表します。
//! 各カテゴリ内で個別に定義されているコードだけが有効で、それ以外は予約扱いです。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_gemini::status::{self, StatusCategory};
//!
//! assert!(status::is_valid(status::SUCCESS));
//! assert!(!status::is_valid(22));
//! assert_eq!(status::simplify_status(status::NOT_FOUND), status::PERMANENT_FAILURE);
//! assert_eq!(status::category(44), Some(StatusCategory::TemporaryFailure));
//! ```

use core::fmt;

pub const INPUT: u8 = 10;

pub const SUCCESS: u8 = 20;
pub const SUCCESS_END_OF_CLIENT_CERTIFICATE_SESSION: u8 = 21;

pub const REDIRECT: u8 = 30;
pub const REDIRECT_TEMPORARY: u8 = 30;
pub const REDIRECT_PERMANENT: u8 = 31;

pub const TEMPORARY_FAILURE: u8 = 40;
pub const UNAVAILABLE: u8 = 41;
pub const CGI_ERROR: u8 = 42;
pub const PROXY_ERROR: u8 = 43;
pub const SLOW_DOWN: u8 = 44;

pub const PERMANENT_FAILURE: u8 = 50;
pub const NOT_FOUND: u8 = 51;
pub const GONE: u8 = 52;
pub const PROXY_REQUEST_REFUSED: u8 = 53;
pub const BAD_REQUEST: u8 = 59;

pub const CLIENT_CERTIFICATE_REQUIRED: u8 = 60;
pub const TRANSIENT_CERTIFICATE_REQUESTED: u8 = 61;
pub const AUTHORISED_CERTIFICATE_REQUIRED: u8 = 62;
pub const CERTIFICATE_NOT_ACCEPTED: u8 = 63;
pub const FUTURE_CERTIFICATE_REJECTED: u8 = 64;
pub const EXPIRED_CERTIFICATE_REJECTED: u8 = 65;

/// 定義済みのステータスコード一覧
pub const DEFINED: &[u8] = &[
    INPUT,
    SUCCESS,
    SUCCESS_END_OF_CLIENT_CERTIFICATE_SESSION,
    REDIRECT_TEMPORARY,
    REDIRECT_PERMANENT,
    TEMPORARY_FAILURE,
    UNAVAILABLE,
    CGI_ERROR,
    PROXY_ERROR,
    SLOW_DOWN,
    PERMANENT_FAILURE,
    NOT_FOUND,
    GONE,
    PROXY_REQUEST_REFUSED,
    BAD_REQUEST,
    CLIENT_CERTIFICATE_REQUIRED,
    TRANSIENT_CERTIFICATE_REQUESTED,
    AUTHORISED_CERTIFICATE_REQUIRED,
    CERTIFICATE_NOT_ACCEPTED,
    FUTURE_CERTIFICATE_REJECTED,
    EXPIRED_CERTIFICATE_REJECTED,
];

/// ステータスのカテゴリ (上位桁)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    /// 1x
    Input,
    /// 2x
    Success,
    /// 3x
    Redirect,
    /// 4x
    TemporaryFailure,
    /// 5x
    PermanentFailure,
    /// 6x
    ClientCertificateRequired,
}

impl StatusCategory {
    /// カテゴリを代表するコード (下位桁が 0)
    pub fn code(self) -> u8 {
        match self {
            StatusCategory::Input => INPUT,
            StatusCategory::Success => SUCCESS,
            StatusCategory::Redirect => REDIRECT,
            StatusCategory::TemporaryFailure => TEMPORARY_FAILURE,
            StatusCategory::PermanentFailure => PERMANENT_FAILURE,
            StatusCategory::ClientCertificateRequired => CLIENT_CERTIFICATE_REQUIRED,
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCategory::Input => "INPUT",
            StatusCategory::Success => "SUCCESS",
            StatusCategory::Redirect => "REDIRECT",
            StatusCategory::TemporaryFailure => "TEMPORARY FAILURE",
            StatusCategory::PermanentFailure => "PERMANENT FAILURE",
            StatusCategory::ClientCertificateRequired => "CLIENT CERTIFICATE REQUIRED",
        };
        f.write_str(name)
    }
}

/// 下位桁を落としてカテゴリのコードにする
pub fn simplify_status(status: u8) -> u8 {
    (status / 10) * 10
}

/// ステータスのカテゴリを返す
///
/// 10..=69 の範囲外は `None`。予約コードでもカテゴリは返す。
pub fn category(status: u8) -> Option<StatusCategory> {
    match status / 10 {
        1 => Some(StatusCategory::Input),
        2 => Some(StatusCategory::Success),
        3 => Some(StatusCategory::Redirect),
        4 => Some(StatusCategory::TemporaryFailure),
        5 => Some(StatusCategory::PermanentFailure),
        6 => Some(StatusCategory::ClientCertificateRequired),
        _ => None,
    }
}

/// 定義済みのステータスかどうか
pub fn is_valid(status: u8) -> bool {
    DEFINED.contains(&status)
}

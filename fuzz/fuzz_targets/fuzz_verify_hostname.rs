#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shiguredo_gemini::verify::{CertificateInfo, verify_hostname};

#[derive(Debug, Arbitrary)]
struct Input {
    dns_names: Vec<String>,
    common_name: String,
    has_san_extension: bool,
    host: String,
}

fuzz_target!(|input: Input| {
    let cert = CertificateInfo {
        dns_names: input.dns_names,
        common_name: input.common_name,
        has_san_extension: input.has_san_extension,
        ..CertificateInfo::default()
    };
    let result = verify_hostname(&cert, &input.host);

    // 大文字小文字は結果に影響しない
    let upper = verify_hostname(&cert, &input.host.to_ascii_uppercase());
    assert_eq!(result.is_ok(), upper.is_ok());
});

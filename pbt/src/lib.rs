//! PBT テスト共通ユーティリティ

use proptest::prelude::*;

// ========================================
// ホスト名生成
// ========================================

/// ホスト名のラベル: 英小文字と数字 (1-12 文字)
///
/// 先頭のハイフンはホスト名として不正なので、ハイフンは 2 文字目以降にだけ置く。
pub fn hostname_label() -> impl Strategy<Value = String> {
    ("[a-z0-9]", "[a-z0-9-]{0,11}").prop_map(|(head, tail)| format!("{}{}", head, tail))
}

/// ホスト名: label *("." label)
pub fn hostname(max_labels: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(hostname_label(), 1..=max_labels).prop_map(|labels| labels.join("."))
}

// ========================================
// ヘッダー生成
// ========================================

/// meta に使える文字 (CR と LF 以外)
pub fn meta_char() -> impl Strategy<Value = char> {
    any::<char>().prop_filter("no CR/LF", |c| *c != '\r' && *c != '\n')
}

/// 指定バイト数以下の meta
pub fn meta(max_bytes: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(meta_char(), 0..=max_bytes).prop_map(move |chars| {
        let mut meta = String::new();
        for c in chars {
            if meta.len() + c.len_utf8() > max_bytes {
                break;
            }
            meta.push(c);
        }
        meta
    })
}

/// ヘッダー行として表現できるステータス (2 桁)
pub fn two_digit_status() -> impl Strategy<Value = u8> {
    10u8..=99
}

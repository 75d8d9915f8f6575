use crate::response::ResponseHeader;
use crate::url::RequestUrl;

/// リクエスト行をエンコード
///
/// `<URL>\r\n`。URL はそれ以上正規化しない。
pub fn encode_request(url: &RequestUrl) -> Vec<u8> {
    let mut buf = Vec::with_capacity(url.len() + 2);
    buf.extend_from_slice(url.as_str().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

/// レスポンスヘッダー行をエンコード
///
/// `<STATUS> <META>\r\n`。meta が空でも SP は省略しない。
///
/// ステータスは 2 桁で表せる 0..=99 のみ。100 以上は行として表現できない。
pub fn encode_header(header: &ResponseHeader) -> Vec<u8> {
    debug_assert!(header.status <= 99, "status must be two digits");
    let mut buf = Vec::with_capacity(header.meta.len() + 5);
    buf.extend_from_slice(format!("{:02}", header.status).as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(header.meta.as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

//! Gemini デコーダーモジュール
//!
//! Sans I/O 設計に基づくデコーダーを提供。
//!
//! ## 使い方
//!
//! ### クライアント (レスポンスヘッダー)
//!
//! ```rust
//! use shiguredo_gemini::ResponseDecoder;
//!
//! let mut decoder = ResponseDecoder::new();
//! decoder.feed(b"20 text/gemini\r\n# Hello");
//!
//! let header = decoder.decode().unwrap().unwrap();
//! assert_eq!(header.status, 20);
//! assert_eq!(header.meta, "text/gemini");
//!
//! // ヘッダー行の後ろはボディの先頭
//! assert_eq!(decoder.remaining(), b"# Hello");
//! ```
//!
//! ### サーバー (リクエスト行)
//!
//! ```rust
//! use shiguredo_gemini::RequestDecoder;
//!
//! let mut decoder = RequestDecoder::new();
//! decoder.feed(b"gemini://example.com/\r\n");
//! let url = decoder.decode().unwrap().unwrap();
//! assert_eq!(url.as_str(), "gemini://example.com/");
//! ```

mod phase;
mod request;
mod response;

pub use request::RequestDecoder;
pub use response::ResponseDecoder;

/// 行の終端を探す
///
/// 最初の LF の位置を返す。LF の直前が CR でなければ `Err(())`。
pub(crate) fn find_crlf(buf: &[u8]) -> Option<Result<usize, ()>> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    if pos == 0 || buf[pos - 1] != b'\r' {
        return Some(Err(()));
    }
    Some(Ok(pos - 1))
}

/// 終端が見つかっていない行の長さ (末尾の CR は終端の一部とみなす)
pub(crate) fn pending_line_len(buf: &[u8]) -> usize {
    if buf.ends_with(b"\r") {
        buf.len() - 1
    } else {
        buf.len()
    }
}

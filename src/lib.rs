//! # shiguredo_gemini
//!
//! 依存なしの Gemini プロトコルライブラリ (Sans I/O)
//!
//! ## 特徴
//!
//! - **依存なし**: 標準ライブラリのみ使用
//! - **Sans I/O**: I/O を完全に分離した設計
//! - **厳格**: ヘッダー行は `DD SP META CRLF` 以外を受け付けない
//!
//! TLS やソケットは扱わない。接続まわりは `rustls_gemini` クレートを参照。
//!
//! ## 使い方
//!
//! ### クライアント (リクエスト送信、レスポンスヘッダー受信)
//!
//! ```rust
//! use shiguredo_gemini::url::RequestUrl;
//! use shiguredo_gemini::{encode_request, ResponseDecoder};
//!
//! // リクエスト行を作成してエンコード
//! let url = RequestUrl::parse("example.com/index.gmi").unwrap();
//! let bytes = encode_request(&url);
//! assert_eq!(bytes, b"gemini://example.com/index.gmi\r\n");
//! // bytes を送信...
//!
//! // レスポンスヘッダーをデコード
//! let mut decoder = ResponseDecoder::new();
//! decoder.feed(b"20 text/gemini\r\n# Hello\n");
//! let header = decoder.decode().unwrap().unwrap();
//! assert_eq!(header.status, 20);
//!
//! // 残りはボディ
//! assert_eq!(decoder.remaining(), b"# Hello\n");
//! ```
//!
//! ### サーバー (リクエスト受信、レスポンスヘッダー送信)
//!
//! ```rust
//! use shiguredo_gemini::{encode_header, RequestDecoder, ResponseHeader};
//!
//! let mut decoder = RequestDecoder::new();
//! decoder.feed(b"gemini://example.com/\r\n");
//! let url = decoder.decode().unwrap().unwrap();
//! assert_eq!(url.url().path(), "/");
//!
//! let bytes = encode_header(&ResponseHeader::new(20, "text/gemini"));
//! assert_eq!(bytes, b"20 text/gemini\r\n");
//! ```

mod decoder;
mod encoder;
mod error;
pub mod host;
mod limits;
mod response;
pub mod status;
pub mod url;
pub mod verify;

pub use decoder::{RequestDecoder, ResponseDecoder};
pub use encoder::{encode_header, encode_request};
pub use error::Error;
pub use limits::{DecoderLimits, META_MAX_LENGTH, URL_MAX_LENGTH};
pub use response::ResponseHeader;

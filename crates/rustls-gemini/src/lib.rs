//! rustls_gemini - rustls integration for shiguredo_gemini
//!
//! rustls を使用したブロッキング I/O の Gemini クライアント/サーバーライブラリ。
//!
//! ## Features
//!
//! - `client` - クライアント機能 (デフォルト有効)
//! - `server` - サーバー機能 (デフォルト有効)
//! - `full` - すべての機能を有効化
//!
//! ## 特徴
//!
//! - **shiguredo_gemini ベース**: Sans I/O ライブラリをベースにした設計
//! - **ブロッキング I/O**: 1 リクエスト 1 接続、呼び出しごとに独立
//! - **TOFU 前提の TLS**: 証明書チェーンは検証せず、リーフ証明書のホスト名と有効期間を確認
//! - **3 段階のタイムアウト**: 接続、ヘッダー受信、ボディ受信
//!
//! ## クライアント
//!
//! ```no_run
//! use std::io::Read;
//!
//! use rustls_gemini::Client;
//!
//! let client = Client::new();
//! let mut response = client.fetch("gemini://geminiprotocol.net/")?;
//! if response.is_success() {
//!     let mut body = Vec::new();
//!     response.body.read_to_end(&mut body)?;
//! }
//! response.body.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## サーバー
//!
//! ```no_run
//! use rustls_gemini::{Reply, Request, Server, server_config_from_pem};
//!
//! let config = server_config_from_pem(
//!     &std::fs::read("cert.pem")?,
//!     &std::fs::read("key.pem")?,
//! )?;
//! let server = Server::bind("0.0.0.0:1965", config)?;
//! server.serve(|request: Request| match request.url().url().path() {
//!     "" | "/" => Reply::new(20, "text/gemini").body_bytes("# Hello\n"),
//!     _ => Reply::new(51, "Not found"),
//! })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## SSLKEYLOGFILE
//!
//! 環境変数 `SSLKEYLOGFILE` が設定されていると TLS のセッション鍵をファイルに書き出す。
//! 通信を復号できるようになるため、デバッグ用途に限ること。

pub mod certificate;
#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
mod connection;
pub mod error;
#[cfg(feature = "client")]
pub mod resolve;
#[cfg(feature = "client")]
pub mod response;
#[cfg(feature = "server")]
pub mod server;
pub mod timeout;
pub mod tls;

pub use certificate::PeerCertificate;
#[cfg(feature = "client")]
pub use client::Client;
pub use error::{Error, Result};
#[cfg(feature = "client")]
pub use response::{Body, Response};
#[cfg(feature = "server")]
pub use server::{Handler, Reply, Request, Server, StatusError, error_response};
pub use timeout::{ConnectionPhase, TimeoutPolicy};
pub use tls::ClientIdentity;
#[cfg(feature = "server")]
pub use tls::server_config_from_pem;

// shiguredo_gemini の型を re-export
pub use shiguredo_gemini::status;
pub use shiguredo_gemini::verify::VerifyOptions;
pub use shiguredo_gemini::{ResponseHeader, url};

//! Gemini サーバー
//!
//! ブロッキング I/O で、接続ごとにスレッドを 1 つ起動する。
//!
//! ## 使い方
//!
//! ```no_run
//! use rustls_gemini::{Reply, Request, Server, server_config_from_pem};
//!
//! let config = server_config_from_pem(
//!     &std::fs::read("cert.pem")?,
//!     &std::fs::read("key.pem")?,
//! )?;
//! let server = Server::bind("0.0.0.0:1965", config)?;
//! server.serve(|request: Request| {
//!     Reply::new(20, "text/gemini").body_bytes(format!("# {}\n", request.url()))
//! })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::io::{self, Cursor, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::{ServerConfig, ServerConnection, StreamOwned};
use shiguredo_gemini::url::RequestUrl;
use shiguredo_gemini::{META_MAX_LENGTH, RequestDecoder, ResponseHeader, encode_header, status};

use crate::certificate::PeerCertificate;
use crate::error::{Error, Result};
use crate::timeout::{ConnectionPhase, DeadlineStream};
use crate::tls::close;

type ServerTlsStream = StreamOwned<ServerConnection, DeadlineStream>;

/// リクエスト行を受信し終えるまでのデフォルトの期限
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// リクエストハンドラー
pub trait Handler: Send + Sync + 'static {
    /// リクエストを処理してレスポンスを返す
    fn handle(&self, request: Request) -> Reply;
}

/// 関数からハンドラーを作成
impl<F> Handler for F
where
    F: Fn(Request) -> Reply + Send + Sync + 'static,
{
    fn handle(&self, request: Request) -> Reply {
        (self)(request)
    }
}

/// 受信したリクエスト
#[derive(Debug, Clone)]
pub struct Request {
    url: RequestUrl,
    peer_certificate: Option<PeerCertificate>,
    peer_addr: SocketAddr,
}

impl Request {
    /// リクエスト URL
    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    /// クライアント証明書 (提示された場合)
    pub fn peer_certificate(&self) -> Option<&PeerCertificate> {
        self.peer_certificate.as_ref()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

/// 送信するレスポンス
pub struct Reply {
    header: ResponseHeader,
    body: Option<Box<dyn Read + Send>>,
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("header", &self.header)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl Reply {
    /// ヘッダーだけのレスポンス
    ///
    /// `status` は 2 桁 (10..=99)。
    pub fn new(status: u8, meta: &str) -> Self {
        Self {
            header: ResponseHeader::new(status, meta),
            body: None,
        }
    }

    /// ボディを設定 (読み終えるまで送信する)
    pub fn body<R: Read + Send + 'static>(mut self, body: R) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    /// バイト列のボディを設定
    pub fn body_bytes(self, body: impl Into<Vec<u8>>) -> Self {
        self.body(Cursor::new(body.into()))
    }

    pub fn status(&self) -> u8 {
        self.header.status
    }

    pub fn meta(&self) -> &str {
        &self.header.meta
    }
}

/// ステータスを持つエラー
///
/// [`error_response`] に渡すとこのステータスのレスポンスになる。
#[derive(Debug)]
pub struct StatusError {
    status: u8,
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StatusError {
    pub fn new(status: u8, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            status,
            source: source.into(),
        }
    }

    pub fn status(&self) -> u8 {
        self.status
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status {}: {}", self.status, self.source)
    }
}

impl std::error::Error for StatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// エラーからレスポンスを作成
///
/// meta はエラーの文字列。[`StatusError`] ならそのステータス、
/// それ以外は 40 (TEMPORARY FAILURE)。
pub fn error_response(err: &(dyn std::error::Error + 'static)) -> Reply {
    match err.downcast_ref::<StatusError>() {
        Some(e) => Reply::new(e.status, &e.to_string()),
        None => Reply::new(status::TEMPORARY_FAILURE, &err.to_string()),
    }
}

/// Gemini サーバー
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    request_timeout: Option<Duration>,
}

impl Server {
    /// 指定アドレスにバインド
    pub fn bind(addr: impl ToSocketAddrs, config: Arc<ServerConfig>) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            config,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        })
    }

    /// ハンドシェイクとリクエスト行の受信の期限を設定 (`Duration::ZERO` で無効)
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout).filter(|d| !d.is_zero());
        self
    }

    /// ローカルアドレスを取得
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// サーバーを起動
    ///
    /// 接続ごとにスレッドを起動する。受け付けに失敗した接続は無視する。
    pub fn serve<H: Handler>(self, handler: H) -> Result<()> {
        let handler = Arc::new(handler);
        loop {
            let (stream, peer_addr) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };
            let config = self.config.clone();
            let handler = handler.clone();
            let request_timeout = self.request_timeout;

            std::thread::spawn(move || {
                if let Err(e) =
                    handle_connection(stream, peer_addr, config, request_timeout, handler.as_ref())
                {
                    tracing::warn!(peer = %peer_addr, error = %e, "connection error");
                }
            });
        }
    }

    /// 単一の接続を処理 (テスト用)
    pub fn handle_one<H: Handler>(&self, handler: H) -> Result<()> {
        let (stream, peer_addr) = self.listener.accept()?;
        handle_connection(
            stream,
            peer_addr,
            self.config.clone(),
            self.request_timeout,
            &handler,
        )
    }
}

/// 1 接続を処理
fn handle_connection<H: Handler>(
    tcp: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    request_timeout: Option<Duration>,
    handler: &H,
) -> Result<()> {
    let deadline = request_timeout.map(|d| Instant::now() + d);
    let conn = ServerConnection::new(config)?;
    let mut stream = StreamOwned::new(conn, DeadlineStream::new(tcp, deadline));

    while stream.conn.is_handshaking() {
        if let Err(e) = stream.conn.complete_io(&mut stream.sock) {
            let _ = stream.sock.shutdown();
            return Err(Error::from_io(ConnectionPhase::Connecting, e));
        }
    }

    let peer_certificate = stream
        .conn
        .peer_certificates()
        .and_then(|certs| certs.first())
        .and_then(|der| PeerCertificate::from_der(der).ok());

    let result = match read_request(&mut stream) {
        Ok(url) => {
            tracing::debug!(peer = %peer_addr, url = %url, "request received");
            // ハンドラーのボディ送信は期限なし
            stream.sock.set_deadline(None);
            let reply = handler.handle(Request {
                url,
                peer_certificate,
                peer_addr,
            });
            write_reply(&mut stream, reply)
        }
        Err(Error::Gemini(e)) => {
            let reply = Reply::new(status::BAD_REQUEST, &format!("Bad URL: {}", e));
            write_reply(&mut stream, reply)
        }
        Err(e) => Err(e),
    };

    close(&mut stream);
    result
}

/// リクエスト行を受信する
fn read_request(stream: &mut ServerTlsStream) -> Result<RequestUrl> {
    let mut decoder = RequestDecoder::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(Error::Io(e)),
        };
        if n == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before request line",
            )));
        }
        decoder.feed(&buf[..n]);
        if let Some(url) = decoder.decode().map_err(Error::Gemini)? {
            return Ok(url);
        }
    }
}

/// ヘッダー行とボディを送信する
fn write_reply(stream: &mut ServerTlsStream, reply: Reply) -> Result<()> {
    let Reply { mut header, body } = reply;
    header.meta = sanitize_meta(&header.meta);
    stream.write_all(&encode_header(&header))?;
    if let Some(mut body) = body {
        io::copy(&mut body, stream)?;
    }
    stream.flush()?;
    Ok(())
}

/// meta を 1 行に収める (改行を除き 1024 バイトで切り詰める)
fn sanitize_meta(meta: &str) -> String {
    let mut out = String::with_capacity(meta.len().min(META_MAX_LENGTH));
    for c in meta.chars().filter(|c| *c != '\r' && *c != '\n') {
        if out.len() + c.len_utf8() > META_MAX_LENGTH {
            break;
        }
        out.push(c);
    }
    out
}

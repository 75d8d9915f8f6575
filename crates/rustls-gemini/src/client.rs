//! Gemini クライアント
//!
//! ブロッキング I/O で 1 リクエスト 1 接続。
//!
//! ## 使い方
//!
//! ```no_run
//! use std::io::Read;
//! use std::time::Duration;
//!
//! use rustls_gemini::Client;
//!
//! let client = Client::new().read_timeout(Duration::from_secs(30));
//! let mut response = client.fetch("gemini://geminiprotocol.net/")?;
//! println!("{} {}", response.status, response.meta);
//!
//! let mut body = String::new();
//! response.body.read_to_string(&mut body)?;
//! response.body.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use rustls::KeyLog;
use shiguredo_gemini::status;
use shiguredo_gemini::url::RequestUrl;
use shiguredo_gemini::verify::VerifyOptions;
use shiguredo_gemini::{ResponseDecoder, ResponseHeader, encode_request};

use crate::connection::{self, Connection, TlsStream};
use crate::error::{Error, Result};
use crate::resolve::{Target, punycode_url};
use crate::response::{Body, Response};
use crate::timeout::{ConnectionPhase, TimeoutPolicy};
use crate::tls::{self, ClientIdentity};

/// ヘッダー受信時の読み取りサイズ
const READ_BUFFER_SIZE: usize = 4096;

/// Gemini クライアント
///
/// 構築後は変更されない。複数のスレッドで共有してよい。
#[derive(Clone)]
pub struct Client {
    no_hostname_check: bool,
    no_time_check: bool,
    insecure: bool,
    allow_invalid_statuses: bool,
    timeouts: TimeoutPolicy,
    identity: Option<Arc<ClientIdentity>>,
    key_log: Option<Arc<dyn KeyLog>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("no_hostname_check", &self.no_hostname_check)
            .field("no_time_check", &self.no_time_check)
            .field("insecure", &self.insecure)
            .field("allow_invalid_statuses", &self.allow_invalid_statuses)
            .field("timeouts", &self.timeouts)
            .field("identity", &self.identity.is_some())
            .field("key_log", &self.key_log.is_some())
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// 新しいクライアントを作成
    ///
    /// 環境変数 `SSLKEYLOGFILE` はここで読み込む。
    pub fn new() -> Self {
        Self {
            no_hostname_check: false,
            no_time_check: false,
            insecure: false,
            allow_invalid_statuses: false,
            timeouts: TimeoutPolicy::default(),
            identity: None,
            key_log: tls::key_log_from_env(),
        }
    }

    /// ホスト名の確認を無効にする
    pub fn no_hostname_check(mut self, value: bool) -> Self {
        self.no_hostname_check = value;
        self
    }

    /// 有効期間の確認を無効にする
    pub fn no_time_check(mut self, value: bool) -> Self {
        self.no_time_check = value;
        self
    }

    /// 証明書の確認をすべて無効にする
    pub fn insecure(mut self, value: bool) -> Self {
        self.insecure = value;
        self
    }

    /// 未定義のステータスコードを受け入れる
    pub fn allow_invalid_statuses(mut self, value: bool) -> Self {
        self.allow_invalid_statuses = value;
        self
    }

    /// 接続タイムアウトを設定 (デフォルト: 15 秒、`Duration::ZERO` で無効)
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = Some(timeout);
        self
    }

    /// 読み取りタイムアウトを設定 (デフォルト: なし、`Duration::ZERO` で無効)
    ///
    /// 指定すると、ハンドシェイク完了からボディを読み終えるまでの接続全体の期限になる。
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read = Some(timeout);
        self
    }

    /// すべてのリクエストで使うクライアント証明書を設定
    pub fn identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = Some(Arc::new(identity));
        self
    }

    /// 鍵ログの出力先を設定 (環境変数の設定より優先)
    pub fn key_log(mut self, key_log: Arc<dyn KeyLog>) -> Self {
        self.key_log = Some(key_log);
        self
    }

    /// タイムアウト設定を取得
    pub fn timeouts(&self) -> &TimeoutPolicy {
        &self.timeouts
    }

    fn verify_options(&self) -> VerifyOptions {
        if self.insecure {
            return VerifyOptions::insecure();
        }
        VerifyOptions {
            check_hostname: !self.no_hostname_check,
            check_validity: !self.no_time_check,
        }
    }

    /// URL のリソースを取得する
    ///
    /// ポート省略時は 1965 に接続する。
    pub fn fetch(&self, url: &str) -> Result<Response> {
        let request_url = punycode_url(url)?;
        let target = Target::for_url(request_url.url())?;
        self.send(&target, &request_url, self.identity.as_deref())
    }

    /// URL とは別のホストに接続して URL のリソースを取得する (プロキシ)
    ///
    /// `host` は `host[:port]`。ポート省略時は 1965。
    /// 証明書はリクエスト URL ではなく `host` に対して検証する。
    pub fn fetch_with_host(&self, host: &str, url: &str) -> Result<Response> {
        let request_url = punycode_url(url)?;
        let target = Target::for_host(host)?;
        self.send(&target, &request_url, self.identity.as_deref())
    }

    /// クライアント証明書を提示して URL のリソースを取得する
    ///
    /// 証明書と秘密鍵がどちらも空なら証明書なしで接続する。
    pub fn fetch_with_cert(&self, url: &str, cert_pem: &[u8], key_pem: &[u8]) -> Result<Response> {
        let request_url = punycode_url(url)?;
        let identity = identity_from_pem(cert_pem, key_pem)?;
        let target = Target::for_url(request_url.url())?;
        self.send(&target, &request_url, identity.as_ref())
    }

    /// [`fetch_with_host`](Self::fetch_with_host) と
    /// [`fetch_with_cert`](Self::fetch_with_cert) の組み合わせ
    pub fn fetch_with_host_and_cert(
        &self,
        host: &str,
        url: &str,
        cert_pem: &[u8],
        key_pem: &[u8],
    ) -> Result<Response> {
        let request_url = punycode_url(url)?;
        let identity = identity_from_pem(cert_pem, key_pem)?;
        let target = Target::for_host(host)?;
        self.send(&target, &request_url, identity.as_ref())
    }

    fn send(
        &self,
        target: &Target,
        url: &RequestUrl,
        identity: Option<&ClientIdentity>,
    ) -> Result<Response> {
        let config = tls::client_config(identity, self.key_log.clone())?;
        let Connection {
            mut stream,
            peer_certificate,
            established,
        } = connection::connect(target, config, self.verify_options(), &self.timeouts)?;

        let (header, prefix) = match exchange(&mut stream, url) {
            Ok(received) => received,
            Err(e) => {
                tls::close(&mut stream);
                return Err(e);
            }
        };

        if !self.allow_invalid_statuses && !status::is_valid(header.status) {
            tls::close(&mut stream);
            return Err(Error::InvalidStatusCode(header.status));
        }

        tracing::debug!(
            url = %url,
            status = header.status,
            phase = %ConnectionPhase::StreamingBody,
            "header received"
        );
        stream
            .sock
            .set_deadline(self.timeouts.body_deadline(established));

        Ok(Response::new(
            header,
            Body::new(prefix, stream),
            peer_certificate,
        ))
    }
}

/// リクエスト単位のクライアント証明書 (両方空なら `None`)
fn identity_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Option<ClientIdentity>> {
    if cert_pem.is_empty() && key_pem.is_empty() {
        return Ok(None);
    }
    ClientIdentity::from_pem(cert_pem, key_pem).map(Some)
}

/// リクエスト行を送ってヘッダー行を受け取る
///
/// ヘッダー行の後ろに続けて受信したバイト列も返す。
fn exchange(stream: &mut TlsStream, url: &RequestUrl) -> Result<(ResponseHeader, Vec<u8>)> {
    stream
        .write_all(&encode_request(url))
        .and_then(|_| stream.flush())
        .map_err(|e| Error::from_io(ConnectionPhase::RequestSent, e))?;
    tracing::debug!(url = %url, phase = %ConnectionPhase::RequestSent, "request sent");

    let mut decoder = ResponseDecoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(Error::from_io(ConnectionPhase::HeaderRead, e)),
        };
        if n == 0 {
            return Err(Error::HeaderRead(
                "connection closed before header line".to_string(),
            ));
        }

        decoder.feed(&buf[..n]);
        if let Some(header) = decoder.decode()? {
            return Ok((header, decoder.into_remaining()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let client = Client::new()
            .connect_timeout(Duration::from_secs(5))
            .read_timeout(Duration::from_secs(10))
            .allow_invalid_statuses(true);
        assert_eq!(client.timeouts().connect, Some(Duration::from_secs(5)));
        assert_eq!(client.timeouts().read, Some(Duration::from_secs(10)));
        assert!(client.allow_invalid_statuses);
    }

    #[test]
    fn verify_options() {
        let client = Client::new();
        assert_eq!(client.verify_options(), VerifyOptions::default());

        let client = Client::new().no_hostname_check(true);
        assert!(!client.verify_options().check_hostname);
        assert!(client.verify_options().check_validity);

        let client = Client::new().no_time_check(true);
        assert!(client.verify_options().check_hostname);
        assert!(!client.verify_options().check_validity);

        let client = Client::new().insecure(true);
        assert_eq!(client.verify_options(), VerifyOptions::insecure());
    }

    #[test]
    fn url_too_long_before_io() {
        // 接続できないアドレスでも、URL の長さは接続前に確認される
        let client = Client::new();
        let prefix = "gemini://192.0.2.1/";
        let url = format!("{}{}", prefix, "a".repeat(1025 - prefix.len()));
        assert!(matches!(
            client.fetch(&url),
            Err(Error::UrlTooLong {
                size: 1025,
                limit: 1024
            })
        ));
    }

    #[test]
    fn invalid_url() {
        let client = Client::new();
        assert!(matches!(
            client.fetch("gemini://user@example.com/"),
            Err(Error::UrlParse(_))
        ));
        assert!(matches!(client.fetch(""), Err(Error::UrlParse(_))));
    }

    #[test]
    fn empty_pem_is_anonymous() {
        assert!(identity_from_pem(b"", b"").unwrap().is_none());
        // 片方だけ空ならエラー
        assert!(matches!(
            identity_from_pem(b"", b"not a pem"),
            Err(Error::ClientCertificate(_))
        ));
    }

    #[test]
    fn client_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }
}

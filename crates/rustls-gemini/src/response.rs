//! レスポンスとボディ

use std::fmt;
use std::io::{self, Read};
use std::time::{Duration, Instant};

use shiguredo_gemini::ResponseHeader;
use shiguredo_gemini::status::{self, StatusCategory};

use crate::certificate::PeerCertificate;
use crate::connection::TlsStream;
use crate::error::{Error, Result};
use crate::timeout::ConnectionPhase;
use crate::tls;

/// Gemini レスポンス
///
/// ボディは接続そのもの。読み終えたら [`Body::close`] するか、ドロップして接続を閉じる。
#[derive(Debug)]
pub struct Response {
    pub status: u8,
    pub meta: String,
    pub body: Body,
    /// サーバーのリーフ証明書
    pub peer_certificate: PeerCertificate,
}

impl Response {
    pub(crate) fn new(
        header: ResponseHeader,
        body: Body,
        peer_certificate: PeerCertificate,
    ) -> Self {
        Self {
            status: header.status,
            meta: header.meta,
            body,
            peer_certificate,
        }
    }

    /// ステータスのカテゴリ
    pub fn category(&self) -> Option<StatusCategory> {
        status::category(self.status)
    }

    /// 2x かどうか
    pub fn is_success(&self) -> bool {
        self.category() == Some(StatusCategory::Success)
    }

    /// 読み取りタイムアウトを設定し直す
    ///
    /// 期限は呼び出した時点からの相対時間。`None` または `Duration::ZERO` で解除。
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.body.set_read_timeout(timeout);
    }
}

/// レスポンスボディ
///
/// ヘッダー行の後ろから接続が閉じられるまでのバイト列。
/// 先頭から順に一度だけ読み出せる。
pub struct Body {
    /// ヘッダーと一緒に受信したボディの先頭
    prefix: Vec<u8>,
    pos: usize,
    stream: Option<TlsStream>,
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("buffered", &(self.prefix.len() - self.pos))
            .field("closed", &self.stream.is_none())
            .finish()
    }
}

impl Body {
    pub(crate) fn new(prefix: Vec<u8>, stream: TlsStream) -> Self {
        Self {
            prefix,
            pos: 0,
            stream: Some(stream),
        }
    }

    /// 閉じられているかどうか
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// 読み取りタイムアウトを設定し直す
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        if let Some(stream) = self.stream.as_mut() {
            let deadline = timeout
                .filter(|d| !d.is_zero())
                .map(|d| Instant::now() + d);
            stream.sock.set_deadline(deadline);
        }
    }

    /// 残りのボディをすべて読み出す
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)
            .map_err(|e| Error::from_io(ConnectionPhase::StreamingBody, e))?;
        Ok(buf)
    }

    /// 接続を閉じる
    ///
    /// close_notify を送ってソケットを解放する。何度呼んでもよい。
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            tls::close(&mut stream);
            tracing::debug!(phase = %ConnectionPhase::Closed, "connection closed");
        }
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.prefix.len() {
            let n = buf.len().min(self.prefix.len() - self.pos);
            buf[..n].copy_from_slice(&self.prefix[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }

        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };
        match stream.read(buf) {
            Ok(n) => Ok(n),
            // close_notify なしで閉じるサーバーが多いので、終端として扱う
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl Drop for Body {
    fn drop(&mut self) {
        self.close();
    }
}

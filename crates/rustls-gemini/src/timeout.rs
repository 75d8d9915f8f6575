//! 接続のフェーズとタイムアウト
//!
//! ## 概要
//!
//! タイムアウトは 3 つのフェーズに分けて扱います。
//!
//! - ハンドシェイク: 接続開始 + `connect` (TCP 接続と TLS ハンドシェイク)
//! - リクエスト送信とヘッダー受信:
//!   - `read` 指定あり: ハンドシェイク完了 + `read`
//!   - `read` 指定なし: 接続開始 + `connect` (ハンドシェイクと同じ期限)
//! - ボディ受信:
//!   - `read` 指定あり: ハンドシェイク完了 + `read`
//!   - `read` 指定なし: 期限なし
//!
//! `read` を指定しない場合、ボディの受信が `connect` の期限で打ち切られることはありません。
//! 期限は絶対時刻で持ち、[`DeadlineStream`] が I/O のたびにソケットへ残り時間を設定します。

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

/// 接続のフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// TCP 接続と TLS ハンドシェイク
    Connecting,
    /// ピア証明書の検証
    Verifying,
    /// リクエスト行の送信
    RequestSent,
    /// ヘッダー行の受信
    HeaderRead,
    /// ボディの受信
    StreamingBody,
    /// 切断済み
    Closed,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Verifying => "verifying",
            ConnectionPhase::RequestSent => "sending request",
            ConnectionPhase::HeaderRead => "reading header",
            ConnectionPhase::StreamingBody => "streaming body",
            ConnectionPhase::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// デフォルトの接続タイムアウト
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// タイムアウト設定
///
/// `Duration::ZERO` または `None` は無効を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// 接続 (TCP + TLS ハンドシェイク) のタイムアウト
    pub connect: Option<Duration>,
    /// 読み書きのタイムアウト (ハンドシェイク完了から)
    pub read: Option<Duration>,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            connect: Some(DEFAULT_CONNECT_TIMEOUT),
            read: None,
        }
    }
}

impl TimeoutPolicy {
    /// タイムアウトなし
    pub fn none() -> Self {
        Self {
            connect: None,
            read: None,
        }
    }

    fn connect(&self) -> Option<Duration> {
        self.connect.filter(|d| !d.is_zero())
    }

    fn read(&self) -> Option<Duration> {
        self.read.filter(|d| !d.is_zero())
    }

    /// ハンドシェイクの期限
    pub fn handshake_deadline(&self, start: Instant) -> Option<Instant> {
        self.connect().map(|d| start + d)
    }

    /// リクエスト送信とヘッダー受信の期限
    pub fn exchange_deadline(&self, start: Instant, established: Instant) -> Option<Instant> {
        match self.read() {
            Some(read) => Some(established + read),
            None => self.handshake_deadline(start),
        }
    }

    /// ボディ受信の期限
    pub fn body_deadline(&self, established: Instant) -> Option<Instant> {
        self.read().map(|read| established + read)
    }
}

/// 期限までの残り時間
///
/// 期限を過ぎていれば `TimedOut` を返す。
pub(crate) fn remaining(deadline: Instant) -> io::Result<Duration> {
    let now = Instant::now();
    if now >= deadline {
        return Err(timed_out());
    }
    Ok(deadline - now)
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded")
}

/// 期限付きで TCP 接続する
#[cfg(feature = "client")]
pub(crate) fn connect_with_deadline(
    addr: &std::net::SocketAddr,
    deadline: Option<Instant>,
) -> io::Result<TcpStream> {
    match deadline {
        Some(deadline) => TcpStream::connect_timeout(addr, remaining(deadline)?),
        None => TcpStream::connect(addr),
    }
}

/// 絶対時刻の期限を持つ TcpStream
///
/// 読み書きのたびに残り時間をソケットのタイムアウトに設定する。
/// 期限切れは `io::ErrorKind::TimedOut` になる。
#[derive(Debug)]
pub struct DeadlineStream {
    inner: TcpStream,
    deadline: Option<Instant>,
}

impl DeadlineStream {
    pub fn new(inner: TcpStream, deadline: Option<Instant>) -> Self {
        Self { inner, deadline }
    }

    /// 期限を設定 (`None` で解除)
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.inner
    }

    /// ソケットを閉じる
    pub fn shutdown(&self) -> io::Result<()> {
        self.inner.shutdown(Shutdown::Both)
    }

    fn arm(&self) -> io::Result<Option<Duration>> {
        match self.deadline {
            Some(deadline) => remaining(deadline).map(Some),
            None => Ok(None),
        }
    }
}

/// WouldBlock はタイムアウトとして扱う (Unix の SO_RCVTIMEO)
fn map_timeout(e: io::Error) -> io::Error {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => timed_out(),
        _ => e,
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.arm()?;
        self.inner.set_read_timeout(timeout)?;
        self.inner.read(buf).map_err(map_timeout)
    }
}

impl Write for DeadlineStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let timeout = self.arm()?;
        self.inner.set_write_timeout(timeout)?;
        self.inner.write(buf).map_err(map_timeout)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

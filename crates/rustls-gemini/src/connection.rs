//! TLS 接続の確立
//!
//! 接続先の解決、TCP 接続、TLS ハンドシェイク、ピア証明書の検証を行う。
//! 途中で失敗した場合は close_notify を送ってソケットを閉じてからエラーを返す。

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use rustls::{ClientConfig, ClientConnection, StreamOwned};
use rustls_pki_types::ServerName;
use shiguredo_gemini::verify::{self, VerifyOptions};

use crate::certificate::PeerCertificate;
use crate::error::{Error, Result};
use crate::resolve::Target;
use crate::timeout::{ConnectionPhase, DeadlineStream, TimeoutPolicy, connect_with_deadline};
use crate::tls::close;

/// クライアント側の TLS ストリーム
pub(crate) type TlsStream = StreamOwned<ClientConnection, DeadlineStream>;

/// 確立済みの接続
#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) stream: TlsStream,
    pub(crate) peer_certificate: PeerCertificate,
    /// ハンドシェイク完了時刻
    pub(crate) established: Instant,
}

/// 接続を確立して証明書を検証する
///
/// 戻り値の接続にはリクエスト送信とヘッダー受信の期限が設定されている。
pub(crate) fn connect(
    target: &Target,
    config: Arc<ClientConfig>,
    options: VerifyOptions,
    policy: &TimeoutPolicy,
) -> Result<Connection> {
    let start = Instant::now();
    let handshake_deadline = policy.handshake_deadline(start);

    tracing::debug!(address = %target.address(), phase = %ConnectionPhase::Connecting, "connecting");
    let tcp = dial(target, handshake_deadline)?;

    let server_name = server_name(target)?;
    let conn = ClientConnection::new(config, server_name)?;
    let mut stream = StreamOwned::new(conn, DeadlineStream::new(tcp, handshake_deadline));

    while stream.conn.is_handshaking() {
        if let Err(e) = stream.conn.complete_io(&mut stream.sock) {
            let _ = stream.sock.shutdown();
            return Err(Error::from_io(ConnectionPhase::Connecting, e));
        }
    }
    let established = Instant::now();

    tracing::debug!(address = %target.address(), phase = %ConnectionPhase::Verifying, "handshake completed");
    let peer_certificate = match peer_certificate(&stream)
        .and_then(|peer| verify_peer(&peer, target, options).map(|_| peer))
    {
        Ok(peer) => peer,
        Err(e) => {
            close(&mut stream);
            return Err(e);
        }
    };

    stream
        .sock
        .set_deadline(policy.exchange_deadline(start, established));

    Ok(Connection {
        stream,
        peer_certificate,
        established,
    })
}

/// 解決したアドレスを順に試す
fn dial(target: &Target, deadline: Option<Instant>) -> Result<std::net::TcpStream> {
    let addrs: Vec<SocketAddr> = (target.ascii_host(), target.port())
        .to_socket_addrs()
        .map_err(|e| Error::HostResolution(format!("{}: {}", target.host(), e)))?
        .collect();
    if addrs.is_empty() {
        return Err(Error::HostResolution(format!(
            "{}: no addresses found",
            target.host()
        )));
    }

    let mut last_error = None;
    for addr in &addrs {
        match connect_with_deadline(addr, deadline) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!(address = %addr, error = %e, "connect failed");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => Err(Error::from_io(ConnectionPhase::Connecting, e)),
        None => Err(Error::HostResolution(target.host().to_string())),
    }
}

fn server_name(target: &Target) -> Result<ServerName<'static>> {
    if let Some(ip) = shiguredo_gemini::host::parse_ip_literal(target.ascii_host()) {
        return Ok(ServerName::IpAddress(ip.into()));
    }
    ServerName::try_from(target.ascii_host().to_string())
        .map_err(|e| Error::TlsHandshake(format!("{}: {}", target.ascii_host(), e)))
}

fn peer_certificate(stream: &TlsStream) -> Result<PeerCertificate> {
    let der = stream
        .conn
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| Error::Certificate("server did not present a certificate".to_string()))?;
    PeerCertificate::from_der(der)
}

/// ASCII 形式、Unicode 形式のどちらかで検証に成功すればよい
///
/// 照合するのはリクエスト URL ではなく接続先のホスト。
fn verify_peer(peer: &PeerCertificate, target: &Target, options: VerifyOptions) -> Result<()> {
    let now = SystemTime::now();
    let mut first_error = None;
    for host in target.identity_hosts() {
        match verify::verify(peer, &host, &options, now) {
            Ok(()) => return Ok(()),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => {
            tracing::debug!(host = %target.host(), field = %e.field(), error = %e, "certificate rejected");
            Err(e.into())
        }
        None => Ok(()),
    }
}

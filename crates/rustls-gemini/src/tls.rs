//! TLS 設定
//!
//! Gemini では自己署名証明書が一般的なため、rustls による証明書チェーンの検証は行わない。
//! ハンドシェイクの署名だけは検証し、信頼性の判断は接続後に
//! [`shiguredo_gemini::verify`] でリーフ証明書に対して行う。
//!
//! ## SSLKEYLOGFILE
//!
//! 環境変数 `SSLKEYLOGFILE` が設定されている場合、TLS のセッション鍵を
//! そのファイルに NSS Key Log 形式で追記する。通信を復号できるようになるため、
//! デバッグ用途以外では設定しないこと。

use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::{
    ClientConfig, ConnectionCommon, DigitallySignedStruct, KeyLog, KeyLogFile, SideData,
    SignatureScheme, StreamOwned,
};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};

use crate::error::{Error, Result};
use crate::timeout::DeadlineStream;

/// 鍵ログの出力先を指定する環境変数
pub const KEY_LOG_ENV: &str = "SSLKEYLOGFILE";

/// 対応する TLS バージョン (TLS 1.2 以上)
static PROTOCOL_VERSIONS: &[&rustls::SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

/// 暗号プロバイダー (aws-lc-rs)
pub(crate) fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::aws_lc_rs::default_provider())
}

/// クライアント証明書と秘密鍵
#[derive(Debug)]
pub struct ClientIdentity {
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    /// PEM 形式の証明書チェーンと秘密鍵から作成
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let certs = CertificateDer::pem_slice_iter(cert_pem)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::ClientCertificate(e.to_string()))?;
        let key = PrivateKeyDer::from_pem_slice(key_pem)
            .map_err(|e| Error::ClientCertificate(e.to_string()))?;
        Self::new(certs, key)
    }

    /// PEM ファイルから作成
    pub fn from_pem_files(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self> {
        let certs = CertificateDer::pem_file_iter(cert_path)
            .map_err(|e| Error::ClientCertificate(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::ClientCertificate(e.to_string()))?;
        let key = PrivateKeyDer::from_pem_file(key_path)
            .map_err(|e| Error::ClientCertificate(e.to_string()))?;
        Self::new(certs, key)
    }

    /// DER 形式の証明書チェーンと秘密鍵から作成
    pub fn new(certs: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Result<Self> {
        if certs.is_empty() {
            return Err(Error::ClientCertificate(
                "no certificate found in PEM".to_string(),
            ));
        }
        Ok(Self { certs, key })
    }

    /// 証明書チェーン (先頭がリーフ)
    pub fn certs(&self) -> &[CertificateDer<'static>] {
        &self.certs
    }
}

impl Clone for ClientIdentity {
    fn clone(&self) -> Self {
        Self {
            certs: self.certs.clone(),
            key: self.key.clone_key(),
        }
    }
}

/// `SSLKEYLOGFILE` が設定されていれば鍵ログを返す
pub fn key_log_from_env() -> Option<Arc<dyn KeyLog>> {
    let path = std::env::var_os(KEY_LOG_ENV)?;
    if path.is_empty() {
        return None;
    }
    tracing::warn!(
        path = ?path,
        "{} is set: TLS session secrets will be written to this file, \
         anyone with access to it can decrypt the traffic",
        KEY_LOG_ENV
    );
    Some(Arc::new(KeyLogFile::new()))
}

/// close_notify を送ってソケットを閉じる (失敗は無視)
pub(crate) fn close<C, S>(stream: &mut StreamOwned<C, DeadlineStream>)
where
    C: DerefMut + Deref<Target = ConnectionCommon<S>>,
    S: SideData,
{
    stream.conn.send_close_notify();
    while stream.conn.wants_write() {
        if stream.conn.write_tls(&mut stream.sock).is_err() {
            break;
        }
    }
    let _ = stream.sock.flush();
    let _ = stream.sock.shutdown();
}

/// クライアントの TLS 設定を作成
///
/// 証明書チェーンは検証しない。`identity` を指定するとクライアント証明書を提示する。
pub fn client_config(
    identity: Option<&ClientIdentity>,
    key_log: Option<Arc<dyn KeyLog>>,
) -> Result<Arc<ClientConfig>> {
    let provider = provider();
    let verifier = Arc::new(AcceptAnyServerCert::new(provider.clone()));
    let builder = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .dangerous()
        .with_custom_certificate_verifier(verifier);

    let mut config = match identity {
        Some(identity) => builder
            .with_client_auth_cert(identity.certs.clone(), identity.key.clone_key())
            .map_err(|e| Error::ClientCertificate(e.to_string()))?,
        None => builder.with_no_client_auth(),
    };
    if let Some(key_log) = key_log {
        config.key_log = key_log;
    }
    Ok(Arc::new(config))
}

/// 任意のサーバー証明書を受け入れる検証器
///
/// ハンドシェイクの署名は検証する。
#[derive(Debug)]
pub struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl AcceptAnyServerCert {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(feature = "server")]
pub use server_side::{AcceptAnyClientCert, server_config, server_config_from_pem};

#[cfg(feature = "server")]
mod server_side {
    use std::sync::Arc;

    use rustls::client::danger::HandshakeSignatureValid;
    use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
    use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
    use rustls::{DigitallySignedStruct, DistinguishedName, ServerConfig, SignatureScheme};
    use rustls_pki_types::pem::PemObject;
    use rustls_pki_types::{CertificateDer, PrivateKeyDer, UnixTime};

    use super::{PROTOCOL_VERSIONS, provider};
    use crate::error::{Error, Result};
use crate::timeout::DeadlineStream;

    /// 任意のクライアント証明書を受け入れる検証器
    ///
    /// クライアント証明書の提示は任意。提示された証明書の扱いはハンドラーに任せる。
    #[derive(Debug)]
    pub struct AcceptAnyClientCert {
        provider: Arc<CryptoProvider>,
    }

    impl AcceptAnyClientCert {
        pub fn new(provider: Arc<CryptoProvider>) -> Self {
            Self { provider }
        }
    }

    impl ClientCertVerifier for AcceptAnyClientCert {
        fn offer_client_auth(&self) -> bool {
            true
        }

        fn client_auth_mandatory(&self) -> bool {
            false
        }

        fn root_hint_subjects(&self) -> &[DistinguishedName] {
            &[]
        }

        fn verify_client_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _now: UnixTime,
        ) -> std::result::Result<ClientCertVerified, rustls::Error> {
            Ok(ClientCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls12_signature(
                message,
                cert,
                dss,
                &self.provider.signature_verification_algorithms,
            )
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls13_signature(
                message,
                cert,
                dss,
                &self.provider.signature_verification_algorithms,
            )
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.provider
                .signature_verification_algorithms
                .supported_schemes()
        }
    }

    /// サーバーの TLS 設定を作成
    pub fn server_config(
        certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Arc<ServerConfig>> {
        let provider = provider();
        let verifier = Arc::new(AcceptAnyClientCert::new(provider.clone()));
        let mut config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(PROTOCOL_VERSIONS)?
            .with_client_cert_verifier(verifier)
            .with_single_cert(certs, key)?;
        if let Some(key_log) = super::key_log_from_env() {
            config.key_log = key_log;
        }
        Ok(Arc::new(config))
    }

    /// PEM 形式の証明書チェーンと秘密鍵からサーバーの TLS 設定を作成
    pub fn server_config_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>> {
        let certs = CertificateDer::pem_slice_iter(cert_pem)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Certificate(e.to_string()))?;
        if certs.is_empty() {
            return Err(Error::Certificate("no certificate found in PEM".to_string()));
        }
        let key =
            PrivateKeyDer::from_pem_slice(key_pem).map_err(|e| Error::Certificate(e.to_string()))?;
        server_config(certs, key)
    }
}

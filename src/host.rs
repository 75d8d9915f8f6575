//! 接続先ホストのパース
//!
//! ## 概要
//!
//! `host[:port]` 形式の接続先をパースします。
//! IDNA 変換前の Unicode ホスト名もそのまま受け付けます。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_gemini::host::Host;
//!
//! let host = Host::parse("example.com:1966").unwrap();
//! assert_eq!(host.host(), "example.com");
//! assert_eq!(host.port(), Some(1966));
//! assert_eq!(host.port_or_default(), 1966);
//!
//! let host = Host::parse("[::1]").unwrap();
//! assert!(host.is_ip_literal());
//! assert_eq!(host.to_string(), "[::1]");
//! ```

use core::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::url::DEFAULT_PORT;

/// Host パースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// 空の入力
    Empty,
    /// 不正な形式
    InvalidFormat,
    /// 不正なホスト
    InvalidHost,
    /// 不正なポート
    InvalidPort,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Empty => write!(f, "empty host"),
            HostError::InvalidFormat => write!(f, "invalid host format"),
            HostError::InvalidHost => write!(f, "invalid host"),
            HostError::InvalidPort => write!(f, "invalid port"),
        }
    }
}

impl std::error::Error for HostError {}

/// 接続先ホスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// ホスト名 (IPv6 は角括弧なし)
    host: String,
    ip: Option<IpAddr>,
    port: Option<u16>,
}

impl Host {
    /// `host[:port]` をパース
    pub fn parse(input: &str) -> Result<Self, HostError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(HostError::Empty);
        }

        if input.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(HostError::InvalidFormat);
        }

        if input.starts_with('[') {
            return parse_ipv6_host(input);
        }

        let (host_part, port) = split_host_port(input)?;
        Self::from_parts(host_part, port)
    }

    /// ホスト部とポートから作成
    ///
    /// `host` は角括弧なしの IPv6 リテラルも受け付ける。
    pub fn from_parts(host: &str, port: Option<u16>) -> Result<Self, HostError> {
        if host.is_empty() {
            return Err(HostError::Empty);
        }
        if let Some(ip) = parse_ip_literal(host) {
            let bare = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            return Ok(Host {
                host: bare.to_string(),
                ip: Some(ip),
                port,
            });
        }
        if !is_valid_reg_name(host) {
            return Err(HostError::InvalidHost);
        }
        Ok(Host {
            host: host.to_string(),
            ip: None,
            port,
        })
    }

    /// ホスト名 (IPv6 は角括弧なし)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// ポート番号 (任意)
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// ポート番号 (省略時は 1965)
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// IP アドレスリテラルなら `Some`
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// IP アドレスリテラルかどうか
    pub fn is_ip_literal(&self) -> bool {
        self.ip.is_some()
    }

    /// ホスト名を差し替えた Host を返す
    pub fn with_host(&self, host: &str) -> Result<Self, HostError> {
        Self::from_parts(host, self.port)
    }

    /// 接続用アドレス (`host:port`、ポートは常に付与)
    pub fn address(&self) -> String {
        join_host_port(&self.host, self.port_or_default())
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ホスト名は記述されたまま保持する
        if matches!(self.ip, Some(IpAddr::V6(_))) {
            write!(f, "[{}]", self.host)?;
        } else {
            write!(f, "{}", self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

/// ホストとポートを結合する (IPv6 は角括弧で囲む)
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// IP アドレスリテラルをパース
///
/// IPv6 は `[::1]` のような角括弧付きも受け付ける。
pub fn parse_ip_literal(input: &str) -> Option<IpAddr> {
    let candidate = if input.len() >= 3 && input.starts_with('[') && input.ends_with(']') {
        &input[1..input.len() - 1]
    } else {
        input
    };
    if let Ok(v4) = candidate.parse::<Ipv4Addr>() {
        return Some(IpAddr::V4(v4));
    }
    candidate.parse::<Ipv6Addr>().ok().map(IpAddr::V6)
}

fn parse_ipv6_host(input: &str) -> Result<Host, HostError> {
    let end = input.find(']').ok_or(HostError::InvalidHost)?;
    let host_inner = &input[1..end];
    let rest = &input[end + 1..];

    let port = if rest.is_empty() {
        None
    } else if let Some(port_str) = rest.strip_prefix(':') {
        Some(parse_port(port_str)?)
    } else {
        return Err(HostError::InvalidHost);
    };

    let ip = host_inner
        .parse::<Ipv6Addr>()
        .map_err(|_| HostError::InvalidHost)?;

    Ok(Host {
        host: host_inner.to_string(),
        ip: Some(IpAddr::V6(ip)),
        port,
    })
}

fn split_host_port(input: &str) -> Result<(&str, Option<u16>), HostError> {
    if let Some((host, port_str)) = input.rsplit_once(':') {
        if host.contains(':') {
            return Err(HostError::InvalidHost);
        }
        if port_str.is_empty() {
            return Err(HostError::InvalidPort);
        }
        let port = parse_port(port_str)?;
        return Ok((host, Some(port)));
    }
    Ok((input, None))
}

pub(crate) fn parse_port(input: &str) -> Result<u16, HostError> {
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return Err(HostError::InvalidPort);
    }
    input.parse::<u16>().map_err(|_| HostError::InvalidPort)
}

/// reg-name (RFC 3986) に IDNA 変換前の非 ASCII 文字を加えたもの
fn is_valid_reg_name(input: &str) -> bool {
    let bytes = input.as_bytes();
    if bytes.is_empty() {
        return false;
    }

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if is_unreserved(b) || is_sub_delim(b) || b >= 0x80 {
            i += 1;
            continue;
        }
        if b == b'%' {
            if i + 2 >= bytes.len() {
                return false;
            }
            if !bytes[i + 1].is_ascii_hexdigit() || !bytes[i + 2].is_ascii_hexdigit() {
                return false;
            }
            i += 3;
            continue;
        }
        return false;
    }

    true
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b'_' || b == b'~'
}

fn is_sub_delim(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
    )
}

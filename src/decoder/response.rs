//! Gemini レスポンスヘッダーデコーダー

use crate::error::Error;
use crate::limits::DecoderLimits;
use crate::response::ResponseHeader;

use super::phase::DecodePhase;
use super::{find_crlf, pending_line_len};

/// レスポンスヘッダーデコーダー (Sans I/O)
///
/// クライアント側でサーバーからのヘッダー行 `<STATUS> <META>\r\n` をパースする際に使用。
/// ヘッダー行より後ろのデータはボディの先頭として [`remaining()`](Self::remaining) に残る。
#[derive(Debug)]
pub struct ResponseDecoder {
    buf: Vec<u8>,
    phase: DecodePhase,
    limits: DecoderLimits,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    /// 新しいデコーダーを作成
    pub fn new() -> Self {
        Self::with_limits(DecoderLimits::default())
    }

    /// 制限付きでデコーダーを作成
    pub fn with_limits(limits: DecoderLimits) -> Self {
        Self {
            buf: Vec::new(),
            phase: DecodePhase::Line,
            limits,
        }
    }

    /// 制限設定を取得
    pub fn limits(&self) -> &DecoderLimits {
        &self.limits
    }

    /// バッファにデータを追加
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// バッファの残りデータを取得
    ///
    /// ヘッダーのデコード後はボディの先頭部分。
    pub fn remaining(&self) -> &[u8] {
        &self.buf
    }

    /// バッファの残りデータを取り出す
    pub fn into_remaining(self) -> Vec<u8> {
        self.buf
    }

    /// ヘッダーをデコード済みかどうか
    pub fn is_complete(&self) -> bool {
        self.phase == DecodePhase::Complete
    }

    /// デコーダーをリセット
    pub fn reset(&mut self) {
        self.buf.clear();
        self.phase = DecodePhase::Line;
    }

    /// ヘッダーをデコード
    ///
    /// ヘッダー行が揃ったら `Some(ResponseHeader)` を返す。
    /// データ不足の場合は `None` を返す。
    /// 既にデコード済みの場合はエラー。
    pub fn decode(&mut self) -> Result<Option<ResponseHeader>, Error> {
        if self.phase == DecodePhase::Complete {
            return Err(Error::MalformedHeader(
                "header already decoded".to_string(),
            ));
        }

        match find_crlf(&self.buf) {
            Some(Ok(end)) => {
                let header = parse_header_line(&self.buf[..end], &self.limits)?;
                self.buf.drain(..end + 2);
                self.phase = DecodePhase::Complete;
                Ok(Some(header))
            }
            Some(Err(())) => Err(Error::MalformedHeader(
                "header line must end with CRLF".to_string(),
            )),
            None => {
                check_status_prefix(&self.buf)?;
                let pending = pending_line_len(&self.buf);
                if pending > self.limits.max_header_line_length() {
                    return Err(Error::MetaTooLong {
                        size: pending - 3,
                        limit: self.limits.max_meta_length,
                    });
                }
                Ok(None)
            }
        }
    }
}

/// ヘッダー行 (CRLF を除く) をパース
///
/// 先頭 2 バイトがステータス、続く SP の後ろすべてが meta。
/// SP のない `20` だけの行は不正。
fn parse_header_line(line: &[u8], limits: &DecoderLimits) -> Result<ResponseHeader, Error> {
    check_status_prefix(line)?;
    if line.len() < 3 {
        return Err(Error::MalformedHeader(format!(
            "header not formatted correctly: {:?}",
            String::from_utf8_lossy(line)
        )));
    }

    let status = (line[0] - b'0') * 10 + (line[1] - b'0');
    let meta = &line[3..];
    if meta.len() > limits.max_meta_length {
        return Err(Error::MetaTooLong {
            size: meta.len(),
            limit: limits.max_meta_length,
        });
    }
    let meta = String::from_utf8(meta.to_vec())
        .map_err(|e| Error::MalformedHeader(format!("invalid UTF-8 in meta: {e}")))?;

    Ok(ResponseHeader { status, meta })
}

/// 届いている範囲でステータス部 (`DD SP`) を確認する
fn check_status_prefix(buf: &[u8]) -> Result<(), Error> {
    for (i, &b) in buf.iter().take(3).enumerate() {
        let ok = if i < 2 { b.is_ascii_digit() } else { b == b' ' };
        if !ok {
            return Err(Error::MalformedHeader(format!(
                "unexpected status value: {:?}",
                String::from_utf8_lossy(&buf[..buf.len().min(3)])
            )));
        }
    }
    Ok(())
}

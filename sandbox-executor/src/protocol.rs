//! The synchronous message bus between host and guest (spec §4.3: "the only
//! outward channel is a synchronous message bus the interceptor owns").
//!
//! Framing is `Content-Length: N\r\n\r\n<json>`, the same scheme the
//! workspace's LSP stdio client uses for the Dart analysis server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostFrame {
    Execute { code: String },
    Result { id: u64, value: Value },
    Error { id: u64, kind: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuestFrame {
    Call {
        id: u64,
        capability: String,
        args: Value,
    },
    Done {
        stdout: String,
        #[serde(default)]
        return_value: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

pub mod io {
    use super::*;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    use crate::errors::{SandboxError, SandboxResult};

    pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, frame: &HostFrame) -> SandboxResult<()> {
        let body = serde_json::to_vec(frame)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        w.write_all(header.as_bytes()).await?;
        w.write_all(&body).await?;
        w.flush().await?;
        Ok(())
    }

    pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> SandboxResult<GuestFrame> {
        let mut header = Vec::<u8>::new();
        let mut last4 = [0u8; 4];
        let mut b = [0u8; 1];
        loop {
            let n = r.read(&mut b).await?;
            if n == 0 {
                return Err(SandboxError::Protocol("guest closed stdout unexpectedly".into()));
            }
            header.push(b[0]);
            last4.rotate_left(1);
            last4[3] = b[0];
            if &last4 == b"\r\n\r\n" {
                break;
            }
            if header.len() > 8192 {
                return Err(SandboxError::Protocol("frame header too large".into()));
            }
        }

        let header_str = String::from_utf8_lossy(&header);
        let mut content_len = 0usize;
        for line in header_str.split("\r\n") {
            if let Some(v) = line.strip_prefix("Content-Length: ") {
                content_len = v.trim().parse().unwrap_or(0);
            }
        }
        if content_len == 0 {
            return Err(SandboxError::Protocol("missing Content-Length".into()));
        }

        let mut body = vec![0u8; content_len];
        r.read_exact(&mut body).await?;
        let frame: GuestFrame = serde_json::from_slice(&body)?;
        Ok(frame)
    }
}

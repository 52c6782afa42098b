//! The daemon wire protocol: one JSON object per request, one per
//! response, one round-trip per connection. Newline-delimited but
//! newline-agnostic on read (EOF also terminates a message).

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cx_core::errors::DaemonError;

/// A client request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Health,
    Status,
    Query {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        options: serde_json::Map<String, Value>,
    },
    Stop,
}

/// The daemon's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            data: None,
        }
    }
}

/// Write one message and flush. Timeouts on the underlying stream
/// surface as `Timeout`.
pub fn write_message<T: Serialize>(writer: &mut impl Write, message: &T) -> Result<(), DaemonError> {
    let mut encoded = serde_json::to_string(message).map_err(|e| DaemonError::Protocol {
        message: format!("encode: {e}"),
    })?;
    encoded.push('\n');
    writer
        .write_all(encoded.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(map_io)
}

/// Read one message: a single line, or everything up to EOF.
pub fn read_message<T: for<'de> Deserialize<'de>>(
    reader: &mut impl BufRead,
) -> Result<T, DaemonError> {
    let mut line = String::new();
    reader.read_line(&mut line).map_err(map_io)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(DaemonError::Protocol {
            message: "connection closed before a message arrived".to_string(),
        });
    }
    serde_json::from_str(trimmed).map_err(|e| DaemonError::Protocol {
        message: format!("decode '{trimmed}': {e}"),
    })
}

fn map_io(e: std::io::Error) -> DaemonError {
    match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => DaemonError::Timeout {
            what: "socket I/O deadline".to_string(),
        },
        _ => DaemonError::Io(e),
    }
}

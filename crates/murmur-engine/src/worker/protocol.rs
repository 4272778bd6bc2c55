//! Line-delimited JSON spoken with the recognition worker.
//!
//! After start-up the worker prints one handshake line, either
//! `{"ready":true}` or `{"error":"..."}`. Each request line
//! `{"audio_path":"...","language":"..."}` is answered by exactly one line,
//! either `{"segments":[...]}` or `{"error":"..."}`.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, Segment};

#[derive(Debug, Serialize)]
pub(super) struct WorkerRequest<'a> {
    pub(super) audio_path: &'a str,
    pub(super) language: &'a str,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub(super) enum WorkerReply {
    Failed { error: String },
    Ready { ready: bool },
    Segments { segments: Vec<Segment> },
}

pub(super) fn send_request<W: Write>(
    writer: &mut W,
    request: &WorkerRequest<'_>,
) -> Result<(), EngineError> {
    let mut payload = serde_json::to_vec(request).map_err(|error| EngineError::Protocol {
        message: error.to_string(),
    })?;
    payload.push(b'\n');
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

pub(super) fn read_reply<R: BufRead>(reader: &mut R) -> Result<WorkerReply, EngineError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(EngineError::WorkerExited);
    }
    serde_json::from_str(line.trim_end()).map_err(|error| EngineError::Protocol {
        message: format!("{error}: {}", line.trim_end()),
    })
}

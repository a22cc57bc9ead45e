// Copyright 2025 The Pigweed Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License. You may obtain a copy of
// the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations under
// the License.

use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::codec;
use crate::error::{Error, Result};

const ACK: &[u8] = b"+";
const NACK: &[u8] = b"-";
const READ_CHUNK: usize = 1024;

/// Framed packet I/O over a byte stream.
///
/// Inbound bytes accumulate in a buffer until a complete frame is present.
/// Every extracted frame is acknowledged: `+` when its checksum matches, `-`
/// otherwise. Frames that fail the checksum are dropped and the target is
/// expected to retransmit.
pub struct Transport<S> {
    stream: S,
    buffer: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Transport<S> {
    /// Takes ownership of `stream` and sends the session-start acknowledgement.
    pub async fn open(stream: S) -> Result<Self> {
        let mut transport = Self {
            stream,
            buffer: Vec::new(),
        };
        transport.write_flush(ACK).await?;
        Ok(transport)
    }

    /// Frames `payload` and writes it to the stream.
    ///
    /// The target's acknowledgement is not awaited here; it precedes the next
    /// reply frame and is skipped when that frame is extracted.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let frame = codec::encode(payload);
        trace!(frame = %String::from_utf8_lossy(&frame), "send");
        self.write_flush(&frame).await
    }

    /// Waits for the next frame with a valid checksum and returns its payload.
    ///
    /// Fails with [`Error::Connection`] if the stream ends first.
    pub async fn receive_one(&mut self) -> Result<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            while let Some(frame) = codec::try_extract(&self.buffer) {
                self.buffer.drain(..frame.consumed);
                if frame.checksum_ok {
                    self.write_flush(ACK).await?;
                    trace!(payload = %String::from_utf8_lossy(&frame.payload), "receive");
                    return Ok(frame.payload);
                }
                warn!(
                    payload = %String::from_utf8_lossy(&frame.payload),
                    "checksum mismatch, requesting retransmission"
                );
                self.write_flush(NACK).await?;
            }

            let bytes_read = self.stream.read(&mut chunk).await?;
            if bytes_read == 0 {
                debug!(buffered = self.buffer.len(), "stream closed while awaiting frame");
                return Err(Error::connection_closed());
            }
            self.buffer.extend_from_slice(&chunk[..bytes_read]);
        }
    }

    /// Releases the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    async fn write_flush(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

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

use futures::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::reply::{self, Peripheral, Registers, StopStatus};
use crate::transport::Transport;

/// The request currently awaiting its reply.
#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    command: &'static str,
}

/// A debug session with a single target.
///
/// Each call sends one request and decodes one reply. The protocol carries
/// no request identifiers, so a new request is refused while an earlier one
/// has not observed its reply. That only happens when a call's future is
/// dropped mid-flight, after which the session should be discarded.
pub struct DebugSession<S> {
    transport: Transport<S>,
    pending: Option<PendingRequest>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> DebugSession<S> {
    /// Opens a session over `stream`, sending the initial acknowledgement.
    pub async fn connect(stream: S) -> Result<Self> {
        Ok(Self {
            transport: Transport::open(stream).await?,
            pending: None,
        })
    }

    /// Queries the halt state (`?`).
    pub async fn get_state(&mut self) -> Result<StopStatus> {
        self.transact(Packet::QueryHaltReason, reply::decode_stop_reply).await
    }

    /// Halts the target (`t`).
    pub async fn stop(&mut self) -> Result<StopStatus> {
        self.transact(Packet::Stop, reply::decode_stop_reply).await
    }

    /// Executes one instruction (`s`).
    pub async fn step(&mut self) -> Result<StopStatus> {
        self.transact(Packet::Step, reply::decode_stop_reply).await
    }

    /// Resumes execution (`c`).
    pub async fn continue_(&mut self) -> Result<StopStatus> {
        self.transact(Packet::Continue, reply::decode_stop_reply).await
    }

    /// Reads the register file (`g`).
    pub async fn get_registers(&mut self) -> Result<Registers> {
        self.transact(Packet::ReadRegisters, reply::decode_registers).await
    }

    /// Reads `length` bytes starting at `addr` (`m`).
    pub async fn get_memory(&mut self, addr: u16, length: u16) -> Result<Vec<u8>> {
        self.transact(Packet::ReadMemory { addr, length }, |payload| {
            reply::decode_memory(payload, length)
        })
        .await
    }

    /// Writes `data` starting at `addr` (`M`).
    ///
    /// Returns whether the target acknowledged the write with `OK`.
    pub async fn set_memory(&mut self, addr: u16, data: &[u8]) -> Result<bool> {
        if u16::try_from(data.len()).is_err() {
            return Err(Error::RequestTooLarge(data.len()));
        }
        let packet = Packet::WriteMemory {
            addr,
            data: data.to_vec(),
        };
        self.transact(packet, |payload| Ok(reply::is_write_ack(payload))).await
    }

    /// Resets the target (`r`). The target sends no reply.
    pub async fn reset(&mut self) -> Result<()> {
        self.transact(Packet::Reset, |_| Ok(())).await
    }

    /// Lists memory-mapped peripherals in the order the target reports them.
    pub async fn list_peripherals(&mut self) -> Result<Vec<Peripheral>> {
        self.transact(Packet::QueryPeripherals, reply::decode_peripherals).await
    }

    /// Whether an earlier request is still waiting for its reply.
    pub fn is_request_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Closes the session and returns the stream.
    pub fn into_inner(self) -> S {
        self.transport.into_inner()
    }

    async fn transact<T>(
        &mut self,
        packet: Packet,
        decode: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<T> {
        self.begin(&packet)?;
        let result = match self.exchange(&packet).await {
            Ok(payload) => decode(&payload),
            Err(e) => Err(e),
        };
        self.pending = None;
        result
    }

    async fn exchange(&mut self, packet: &Packet) -> Result<Vec<u8>> {
        self.transport.send(packet.encode_payload().as_bytes()).await?;
        if !packet.expects_reply() {
            return Ok(Vec::new());
        }
        self.transport.receive_one().await
    }

    fn begin(&mut self, packet: &Packet) -> Result<()> {
        if let Some(pending) = self.pending {
            return Err(Error::RequestPending {
                command: pending.command,
            });
        }
        debug!(command = packet.name(), "request");
        self.pending = Some(PendingRequest {
            command: packet.name(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::codec;
    use crate::reply::HaltState;
    use crate::transport::tests::MockStream;

    /// Target output for the given reply payloads, each preceded by the
    /// target's acknowledgement of the request.
    fn replies(payloads: &[&[u8]]) -> Vec<u8> {
        let mut input = Vec::new();
        for payload in payloads {
            input.push(b'+');
            input.extend_from_slice(&codec::encode(payload));
        }
        input
    }

    async fn session(payloads: &[&[u8]]) -> DebugSession<MockStream> {
        DebugSession::connect(MockStream::new(replies(payloads)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_state() {
        let mut session = session(&[b"T05048000"]).await;
        let status = session.get_state().await.unwrap();
        assert_eq!(status.state, HaltState::Stopped);
        assert_eq!(status.signal, 0x05);
        assert_eq!(status.address, Some(0x8000));
        assert_eq!(session.into_inner().write_data, b"+$?#3F+");
    }

    #[tokio::test]
    async fn test_run_control_commands() {
        let mut session = session(&[b"S02", b"T05048003", b"S13"]).await;
        assert_eq!(session.stop().await.unwrap().signal, 0x02);
        assert_eq!(session.step().await.unwrap().address, Some(0x8003));
        assert_eq!(session.continue_().await.unwrap().signal, 0x13);
        assert_eq!(session.into_inner().write_data, b"+$t#74+$s#73+$c#63+");
    }

    #[tokio::test]
    async fn test_remote_error_leaves_session_usable() {
        let mut session = session(&[b"EInvalidAddress", b"S05"]).await;
        match session.step().await {
            Err(Error::Remote(message)) => assert_eq!(message, "InvalidAddress"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!session.is_request_pending());
        assert_eq!(session.step().await.unwrap().signal, 0x05);
    }

    #[tokio::test]
    async fn test_protocol_error_leaves_session_usable() {
        let mut session = session(&[b"OK", b"S05"]).await;
        assert!(matches!(session.get_state().await, Err(Error::Protocol(_))));
        assert_eq!(session.get_state().await.unwrap().signal, 0x05);
    }

    #[tokio::test]
    async fn test_get_registers() {
        let mut session = session(&[b"0102FD12C0A530"]).await;
        let registers = session.get_registers().await.unwrap();
        assert_eq!(registers.pc(), 0xC0A5);
        assert_eq!(registers.sr(), 0x30);
        assert_eq!(session.into_inner().write_data, b"+$g#67+");
    }

    #[tokio::test]
    async fn test_get_memory() {
        let mut session = session(&[b"deadbeef"]).await;
        let memory = session.get_memory(0x0200, 4).await.unwrap();
        assert_eq!(memory, [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(session.into_inner().write_data, b"+$m0200,0004#1F+");
    }

    #[tokio::test]
    async fn test_set_memory() {
        let mut session = session(&[b"OK", b"E01"]).await;
        assert!(session.set_memory(0x0200, &[0xea]).await.unwrap());
        assert!(!session.set_memory(0x0200, &[0xea]).await.unwrap());
        let written = session.into_inner().write_data;
        assert!(written.starts_with(b"+$M0200,0001:ea#FC+"));
    }

    #[tokio::test]
    async fn test_set_memory_rejects_oversized_writes() {
        let mut session = session(&[]).await;
        let data = vec![0u8; 0x10000];
        assert!(matches!(
            session.set_memory(0, &data).await,
            Err(Error::RequestTooLarge(0x10000))
        ));
        assert!(!session.is_request_pending());
    }

    #[tokio::test]
    async fn test_reset_does_not_wait_for_reply() {
        let mut session = session(&[]).await;
        session.reset().await.unwrap();
        assert!(!session.is_request_pending());
        assert_eq!(session.into_inner().write_data, b"+$r#72");
    }

    #[tokio::test]
    async fn test_list_peripherals() {
        let mut session = session(&[b"UART:8000:80FF;TIMER:9000:9003"]).await;
        let peripherals = session.list_peripherals().await.unwrap();
        let names: Vec<_> = peripherals.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["UART", "TIMER"]);
        assert_eq!(peripherals[1].end_addr, 0x9003);
    }

    #[tokio::test]
    async fn test_closed_stream_is_fatal() {
        let mut session = session(&[]).await;
        let err = session.get_state().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(err.is_fatal());
        assert!(!session.is_request_pending());
    }

    #[tokio::test]
    async fn test_abandoned_request_blocks_next_request() {
        let mut session = DebugSession::connect(MockStream::stalled()).await.unwrap();

        // The request is sent, then the future is dropped while awaiting the
        // reply.
        assert!(session.get_state().now_or_never().is_none());
        assert!(session.is_request_pending());

        match session.step().await {
            Err(Error::RequestPending { command }) => assert_eq!(command, "?"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(session.into_inner().write_data, b"+$?#3F");
    }
}

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

/// A command sent to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Query the halt state.
    ///
    /// Format: `?`
    QueryHaltReason,
    /// Read all registers.
    ///
    /// Format: `g`
    ReadRegisters,
    /// Read memory from the target.
    ///
    /// Format: `m<addr4>,<len4>`
    ReadMemory { addr: u16, length: u16 },
    /// Write memory on the target.
    ///
    /// Format: `M<addr4>,<len4>:<hex_data>`
    WriteMemory { addr: u16, data: Vec<u8> },
    /// Reset the target. The target does not reply.
    ///
    /// Format: `r`
    Reset,
    /// Halt execution.
    ///
    /// Format: `t`
    Stop,
    /// Execute a single instruction.
    ///
    /// Format: `s`
    Step,
    /// Resume execution.
    ///
    /// Format: `c`
    Continue,
    /// Enumerate memory-mapped peripherals.
    ///
    /// Format: `qPeripherals`
    QueryPeripherals,
}

impl Packet {
    /// Encodes the packet into its string representation (without framing).
    ///
    /// Callers must keep `WriteMemory` data within `u16::MAX` bytes; longer
    /// data has its length field truncated.
    pub fn encode_payload(&self) -> String {
        match self {
            Packet::QueryHaltReason => "?".to_string(),
            Packet::ReadRegisters => "g".to_string(),
            Packet::ReadMemory { addr, length } => format!("m{addr:04X},{length:04X}"),
            Packet::WriteMemory { addr, data } => {
                format!("M{addr:04X},{:04X}:{}", data.len(), hex::encode(data))
            }
            Packet::Reset => "r".to_string(),
            Packet::Stop => "t".to_string(),
            Packet::Step => "s".to_string(),
            Packet::Continue => "c".to_string(),
            Packet::QueryPeripherals => "qPeripherals".to_string(),
        }
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Packet::QueryHaltReason => "?",
            Packet::ReadRegisters => "g",
            Packet::ReadMemory { .. } => "m",
            Packet::WriteMemory { .. } => "M",
            Packet::Reset => "r",
            Packet::Stop => "t",
            Packet::Step => "s",
            Packet::Continue => "c",
            Packet::QueryPeripherals => "qPeripherals",
        }
    }

    /// Whether the target answers this packet with a reply frame.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Packet::Reset)
    }
}

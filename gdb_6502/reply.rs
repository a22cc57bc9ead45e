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

//! Typed decoders for reply payloads.

use core::fmt;

use nom::bytes::complete::{take, take_while_m_n};
use nom::character::complete::char;
use nom::combinator::map_res;
use nom::sequence::preceded;
use nom::{IResult, Parser};

use crate::error::{Error, Result};

/// Number of bytes in a register reply.
pub const REGISTER_COUNT: usize = 7;

/// Whether the target is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltState {
    Running,
    Stopped,
}

/// Decoded reply to `?`, `t`, `s` and `c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopStatus {
    pub state: HaltState,
    pub signal: u8,
    /// Program counter, present only in `T` replies.
    pub address: Option<u16>,
}

impl StopStatus {
    fn new(signal: u8, address: Option<u16>) -> Self {
        // Signal 0 is "no signal": nothing stopped the target.
        let state = if signal == 0 {
            HaltState::Running
        } else {
            HaltState::Stopped
        };
        Self {
            state,
            signal,
            address,
        }
    }
}

impl fmt::Display for StopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (signal 0x{:02X})", self.state, self.signal)?;
        if let Some(address) = self.address {
            write!(f, " at 0x{address:04X}")?;
        }
        Ok(())
    }
}

/// Register file in wire order: `AC XR YR SP PCH PCL SR`.
///
/// The program counter pair is big-endian because the target sends it as
/// formatted hex text, not as raw memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers([u8; REGISTER_COUNT]);

impl Registers {
    pub const NAMES: [&'static str; REGISTER_COUNT] = ["AC", "XR", "YR", "SP", "PCH", "PCL", "SR"];

    pub fn ac(&self) -> u8 {
        self.0[0]
    }

    pub fn xr(&self) -> u8 {
        self.0[1]
    }

    pub fn yr(&self) -> u8 {
        self.0[2]
    }

    pub fn sp(&self) -> u8 {
        self.0[3]
    }

    pub fn pc(&self) -> u16 {
        u16::from_be_bytes([self.0[4], self.0[5]])
    }

    pub fn sr(&self) -> u8 {
        self.0[6]
    }

    pub fn as_bytes(&self) -> &[u8; REGISTER_COUNT] {
        &self.0
    }
}

impl From<[u8; REGISTER_COUNT]> for Registers {
    fn from(bytes: [u8; REGISTER_COUNT]) -> Self {
        Self(bytes)
    }
}

/// A memory-mapped peripheral reported by `qPeripherals`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peripheral {
    pub name: String,
    pub start_addr: u16,
    pub end_addr: u16,
}

/// Decodes the stop-reply grammar shared by `?`, `t`, `s` and `c`.
///
/// * `E<message>` is a target error.
/// * `S<sig2>` carries only a signal.
/// * `T<sig2><reg2><pc4>` also carries the program counter, found at byte
///   offset 5 after the register number.
pub fn decode_stop_reply(payload: &[u8]) -> Result<StopStatus> {
    match payload.first() {
        Some(b'E') => Err(remote_error(payload)),
        Some(b'S') => {
            let (_, signal) = signal_reply(as_text(payload)?)
                .map_err(|_| Error::protocol("malformed stop reply", payload))?;
            Ok(StopStatus::new(signal, None))
        }
        Some(b'T') => {
            let (_, (signal, pc)) = trap_reply(as_text(payload)?)
                .map_err(|_| Error::protocol("malformed stop reply", payload))?;
            Ok(StopStatus::new(signal, Some(pc)))
        }
        _ => Err(Error::protocol("unexpected stop reply", payload)),
    }
}

/// Decodes a `g` reply.
pub fn decode_registers(payload: &[u8]) -> Result<Registers> {
    let data = decode_hex_reply(payload, REGISTER_COUNT)?;
    let bytes: [u8; REGISTER_COUNT] = data
        .try_into()
        .map_err(|_| Error::protocol("register reply has wrong length", payload))?;
    Ok(Registers(bytes))
}

/// Decodes an `m` reply of `length` bytes.
pub fn decode_memory(payload: &[u8], length: u16) -> Result<Vec<u8>> {
    decode_hex_reply(payload, usize::from(length))
}

/// Whether an `M` reply acknowledges the write.
pub fn is_write_ack(payload: &[u8]) -> bool {
    payload == b"OK"
}

/// Decodes a `qPeripherals` reply: `name:start:end` records separated by `;`.
///
/// Empty records, such as one left by a trailing separator, are skipped.
pub fn decode_peripherals(payload: &[u8]) -> Result<Vec<Peripheral>> {
    as_text(payload)?
        .split(';')
        .filter(|record| !record.is_empty())
        .map(|record| {
            parse_peripheral(record)
                .ok_or_else(|| Error::protocol("malformed peripheral record", record.as_bytes()))
        })
        .collect()
}

fn parse_peripheral(record: &str) -> Option<Peripheral> {
    let mut fields = record.split(':');
    let (Some(name), Some(start), Some(end), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return None;
    };
    Some(Peripheral {
        name: name.to_string(),
        start_addr: u16::from_str_radix(start, 16).ok()?,
        end_addr: u16::from_str_radix(end, 16).ok()?,
    })
}

fn decode_hex_reply(payload: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    match hex::decode(payload) {
        Ok(data) if data.len() == expected_len => Ok(data),
        // "E01" style replies are only errors when they are not the data.
        _ if payload.first() == Some(&b'E') => Err(remote_error(payload)),
        Ok(data) => Err(Error::Protocol(format!(
            "expected {expected_len} bytes, got {}",
            data.len()
        ))),
        Err(e) => Err(Error::protocol(&format!("invalid hex data ({e})"), payload)),
    }
}

fn remote_error(payload: &[u8]) -> Error {
    Error::Remote(String::from_utf8_lossy(&payload[1..]).into_owned())
}

fn as_text(payload: &[u8]) -> Result<&str> {
    core::str::from_utf8(payload).map_err(|_| Error::protocol("reply is not text", payload))
}

fn hex_u8(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
        |s: &str| u8::from_str_radix(s, 16),
    )
    .parse(input)
}

fn hex_u16(input: &str) -> IResult<&str, u16> {
    map_res(
        take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
        |s: &str| u16::from_str_radix(s, 16),
    )
    .parse(input)
}

fn signal_reply(input: &str) -> IResult<&str, u8> {
    preceded(char('S'), hex_u8).parse(input)
}

fn trap_reply(input: &str) -> IResult<&str, (u8, u16)> {
    (preceded(char('T'), hex_u8), take(2usize), hex_u16)
        .map(|(signal, _register, pc)| (signal, pc))
        .parse(input)
}

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

//! Framing for the remote protocol.
//!
//! Format: `$<payload>#<checksum>`, where the checksum is two uppercase hex
//! digits. No escaping or run-length encoding is applied.

const FRAME_START: u8 = b'$';
const FRAME_END: u8 = b'#';
const CHECKSUM_LEN: usize = 2;

/// Calculates the checksum for the given data.
///
/// The checksum is the sum of all bytes modulo 256.
pub fn calculate_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, &x| acc.wrapping_add(x))
}

/// Wraps `payload` in a frame.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 2 + CHECKSUM_LEN);
    frame.push(FRAME_START);
    frame.extend_from_slice(payload);
    frame.push(FRAME_END);
    frame.extend_from_slice(format!("{:02X}", calculate_checksum(payload)).as_bytes());
    frame
}

/// A frame located at the front of a receive buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    pub payload: Vec<u8>,
    pub checksum_ok: bool,
    /// Bytes to drop from the front of the buffer, including anything that
    /// preceded the frame start.
    pub consumed: usize,
}

/// Locates the first complete frame in `buffer`.
///
/// Returns `None` when a start marker, an end marker or the two checksum
/// digits are not buffered yet. The buffer is never modified; the caller
/// drains `consumed` bytes once it has handled the frame.
pub fn try_extract(buffer: &[u8]) -> Option<Frame> {
    let start = buffer.iter().position(|&b| b == FRAME_START)?;
    let end = start + 1 + buffer[start + 1..].iter().position(|&b| b == FRAME_END)?;
    let consumed = end + 1 + CHECKSUM_LEN;
    if buffer.len() < consumed {
        return None;
    }

    let payload = buffer[start + 1..end].to_vec();
    let checksum_ok = parse_checksum(&buffer[end + 1..consumed])
        .is_some_and(|claimed| claimed == calculate_checksum(&payload));

    Some(Frame {
        payload,
        checksum_ok,
        consumed,
    })
}

fn parse_checksum(digits: &[u8]) -> Option<u8> {
    let digits = core::str::from_utf8(digits).ok()?;
    u8::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        assert_eq!(calculate_checksum(b""), 0);
        assert_eq!(calculate_checksum(b"OK"), 0x9a);
        assert_eq!(calculate_checksum(&[0xff, 0x02]), 0x01);
    }

    #[test]
    fn test_encode_uses_uppercase_checksum() {
        assert_eq!(encode(b"g"), b"$g#67");
        assert_eq!(encode(b"qPeripherals"), b"$qPeripherals#F0");
        assert_eq!(encode(b""), b"$#00");
    }

    #[test]
    fn test_extract_encoded_frames() {
        for payload in [&b""[..], b"?", b"m0200,0010", b"T1104007B", &[0x7fu8, 0x80, 0xfe][..]] {
            let frame = try_extract(&encode(payload)).unwrap();
            assert!(frame.checksum_ok);
            assert_eq!(frame.payload, payload);
            assert_eq!(frame.consumed, payload.len() + 4);
        }
    }

    #[test]
    fn test_corrupted_checksum_still_locates_payload() {
        let encoded = encode(b"S05");
        for offset in [encoded.len() - 2, encoded.len() - 1] {
            let mut corrupted = encoded.clone();
            corrupted[offset] = if corrupted[offset] == b'0' { b'1' } else { b'0' };
            let frame = try_extract(&corrupted).unwrap();
            assert!(!frame.checksum_ok);
            assert_eq!(frame.payload, b"S05");
            assert_eq!(frame.consumed, encoded.len());
        }
    }

    #[test]
    fn test_non_hex_checksum_is_a_mismatch() {
        let frame = try_extract(b"$OK#zz").unwrap();
        assert!(!frame.checksum_ok);
        assert_eq!(frame.payload, b"OK");
    }

    #[test]
    fn test_partial_frames_need_more_data() {
        let encoded = encode(b"OK");
        for len in 0..encoded.len() {
            assert_eq!(try_extract(&encoded[..len]), None, "prefix of {len} bytes");
        }
        assert_eq!(try_extract(b"+++"), None);
    }

    #[test]
    fn test_leading_bytes_are_consumed() {
        let mut buffer = b"+-garbage".to_vec();
        buffer.extend_from_slice(&encode(b"OK"));
        let frame = try_extract(&buffer).unwrap();
        assert!(frame.checksum_ok);
        assert_eq!(frame.payload, b"OK");
        assert_eq!(frame.consumed, buffer.len());
    }

    #[test]
    fn test_three_frames_in_one_chunk() {
        let mut buffer = Vec::new();
        for payload in [&b"S05"[..], b"OK", b"0102"] {
            buffer.extend_from_slice(&encode(payload));
        }

        let mut payloads = Vec::new();
        while let Some(frame) = try_extract(&buffer) {
            assert!(frame.checksum_ok);
            payloads.push(frame.payload);
            buffer.drain(..frame.consumed);
        }
        assert_eq!(payloads, [&b"S05"[..], b"OK", b"0102"]);
        assert!(buffer.is_empty());
    }
}

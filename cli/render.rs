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

use core::fmt::Write;

use gdb_6502::{Peripheral, Registers, SourceWindow};

pub fn registers(registers: &Registers) -> String {
    let mut out = String::from("Registers\n");
    let byte = |out: &mut String, name: &str, value: u8| {
        let _ = writeln!(out, "{name}: 0x{value:02X} ({value})");
    };
    byte(&mut out, "AC", registers.ac());
    byte(&mut out, "XR", registers.xr());
    byte(&mut out, "YR", registers.yr());
    byte(&mut out, "SP", registers.sp());
    let _ = writeln!(out, "PC: 0x{:04x}", registers.pc());
    byte(&mut out, "SR", registers.sr());
    out
}

pub fn peripherals(peripherals: &[Peripheral]) -> String {
    let mut out = String::from("Peripherals\n");
    for p in peripherals {
        let _ = writeln!(out, "{}:\t{:04X}:{:04X}", p.name, p.start_addr, p.end_addr);
    }
    out
}

/// Hex dump in colon-separated groups of two bytes, grouped from the end.
pub fn memory(data: &[u8]) -> String {
    let mut groups: Vec<String> = data.rchunks(2).map(hex::encode).collect();
    groups.reverse();
    groups.join(":")
}

/// Numbered source lines with the center line marked.
pub fn source_window(window: &SourceWindow<'_>) -> String {
    let center = window.center.map(|line| line.index);
    let mut out = String::new();
    for line in window.lines() {
        let marker = if Some(line.index) == center { "=>" } else { "  " };
        let _ = writeln!(out, "{marker} {:>5}  {}", line.index + 1, line.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use gdb_6502::ListingDocument;

    use super::*;

    #[test]
    fn test_registers() {
        let registers = Registers::from([0x01, 0x02, 0xFD, 0x12, 0xC0, 0xA5, 0x30]);
        assert_eq!(
            super::registers(&registers),
            "Registers\n\
             AC: 0x01 (1)\n\
             XR: 0x02 (2)\n\
             YR: 0xFD (253)\n\
             SP: 0x12 (18)\n\
             PC: 0xc0a5\n\
             SR: 0x30 (48)\n"
        );
    }

    #[test]
    fn test_peripherals() {
        let list = [Peripheral {
            name: "UART".to_string(),
            start_addr: 0x8000,
            end_addr: 0x80FF,
        }];
        assert_eq!(peripherals(&list), "Peripherals\nUART:\t8000:80FF\n");
    }

    #[test]
    fn test_memory() {
        assert_eq!(memory(&[]), "");
        assert_eq!(memory(&[0xea]), "ea");
        assert_eq!(memory(&[0xde, 0xad, 0xbe, 0xef]), "dead:beef");
        assert_eq!(memory(&[0x01, 0x02, 0x03]), "01:0203");
    }

    #[test]
    fn test_source_window() {
        let doc = ListingDocument::parse(
            "Source: a.s\n00:0200 EA start: nop\n00:0201 EA : nop\n00:0202 60 : rts\n",
        )
        .unwrap();
        assert_eq!(
            source_window(&doc.source_window_for_address(0x0201, 1)),
            "       1  nop\n=>     2  nop\n       3  rts\n"
        );
        assert_eq!(source_window(&SourceWindow::default()), "");
    }
}

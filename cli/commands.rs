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

//! Parsing of commands typed at the prompt.

pub const HELP: &str = "\
q|quit :            Quit
b|break :           Add breakpoint (not supported)
c|cont|continue :   Resume execution
s|step :            Step one instruction
h|halt :            Halt processor
r|reset :           Reset the target system
i|info :            Get info
    r|reg|registers :   Register values
    p|peri|peripherals : Memory-mapped peripherals
    sym|symbol NAME :   Address of a symbol in the listing
x|examine ADDR [N] : Examine N bytes of memory at address ADDR (hex)
x/N ADDR :          Examine N bytes of memory at address ADDR (hex)
set ADDR VALUE :    Set the byte at ADDR (accepts 0x, 0o prefixes)
l|list [SYMBOL|ADDR] : Show source around a symbol, address or the program counter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Break,
    Halt,
    Step,
    Continue,
    Set { addr: u16, value: u8 },
    Reset,
    Info(Info),
    Examine { addr: u16, length: u16 },
    /// Source around a symbol or address, or around the program counter.
    List(Option<String>),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Info {
    Registers,
    Peripherals,
    Symbol(String),
}

fn expand(word: &str) -> &str {
    match word {
        "q" => "quit",
        "b" => "break",
        "c" | "cont" => "continue",
        "s" => "step",
        "i" => "info",
        "x" => "examine",
        "h" => "halt",
        "r" => "reset",
        "l" => "list",
        other => other,
    }
}

fn expand_info(word: &str) -> &str {
    match word {
        "r" | "reg" => "registers",
        "p" | "peri" => "peripherals",
        "sym" => "symbol",
        other => other,
    }
}

/// Parses one input line. Blank lines yield `None`.
///
/// The error is the message to show the user.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&first, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (expand(first), args) {
        ("help", []) => Command::Help,
        ("break", _) => Command::Break,
        ("halt", []) => Command::Halt,
        ("step", []) => Command::Step,
        ("continue", []) => Command::Continue,
        ("reset", []) => Command::Reset,
        ("quit", []) => Command::Quit,
        ("set", [addr, value]) => {
            let addr = narrow(parse_number(addr)?)?;
            let value = narrow(parse_number(value)?)?;
            Command::Set { addr, value }
        }
        ("info", []) => return Err("No info command".to_string()),
        ("info", [what, rest @ ..]) => match (expand_info(what), rest) {
            ("registers", []) => Command::Info(Info::Registers),
            ("peripherals", []) => Command::Info(Info::Peripherals),
            ("symbol", [name]) => Command::Info(Info::Symbol(name.to_string())),
            _ => return Err("Unknown info command".to_string()),
        },
        ("examine", [addr]) => Command::Examine {
            addr: parse_hex(addr)?,
            length: 1,
        },
        ("examine", [addr, length]) => Command::Examine {
            addr: parse_hex(addr)?,
            length: parse_length(length)?,
        },
        ("list", []) => Command::List(None),
        ("list", [target]) => Command::List(Some(target.to_string())),
        (word, [addr]) if word.starts_with("x/") => Command::Examine {
            addr: parse_hex(addr)?,
            length: parse_length(&word[2..])?,
        },
        _ => return Err("Unknown command".to_string()),
    };
    Ok(Some(command))
}

/// Parses an integer with an optional `0x` or `0o` prefix.
pub fn parse_number(s: &str) -> Result<u32, String> {
    let result = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if let Some(octal) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        u32::from_str_radix(octal, 8)
    } else {
        s.parse::<u32>()
    };
    result.map_err(|e| format!("Invalid value: {s}: {e}"))
}

fn narrow<T: TryFrom<u32>>(value: u32) -> Result<T, String> {
    T::try_from(value).map_err(|_| format!("Invalid value: {value} is out of range"))
}

fn parse_hex(s: &str) -> Result<u16, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("Invalid address: {s}: {e}"))
}

fn parse_length(s: &str) -> Result<u16, String> {
    s.parse::<u16>().map_err(|e| format!("Invalid length: {s}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("10").unwrap(), 10);
        assert_eq!(parse_number("0x10").unwrap(), 16);
        assert_eq!(parse_number("0X10").unwrap(), 16);
        assert_eq!(parse_number("0o10").unwrap(), 8);
        assert!(parse_number("invalid").is_err());
        assert!(parse_number("0xZZ").is_err());
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_abbreviations() {
        let cases = [
            ("q", Command::Quit),
            ("b", Command::Break),
            ("c", Command::Continue),
            ("cont", Command::Continue),
            ("s", Command::Step),
            ("h", Command::Halt),
            ("r", Command::Reset),
            ("l", Command::List(None)),
            ("i r", Command::Info(Info::Registers)),
            ("info reg", Command::Info(Info::Registers)),
            ("i p", Command::Info(Info::Peripherals)),
            ("i peri", Command::Info(Info::Peripherals)),
            ("i sym loop", Command::Info(Info::Symbol("loop".to_string()))),
        ];
        for (line, expected) in cases {
            assert_eq!(command(line), expected, "{line:?}");
        }
    }

    #[test]
    fn test_set() {
        assert_eq!(
            command("set 0x0200 0xEA"),
            Command::Set {
                addr: 0x0200,
                value: 0xEA
            }
        );
        assert_eq!(
            command("set 512 0o17"),
            Command::Set {
                addr: 0x0200,
                value: 0o17
            }
        );
        assert!(parse("set 0x0200 256").is_err());
        assert!(parse("set 0x10000 1").is_err());
        assert!(parse("set 0x0200 nope").is_err());
    }

    #[test]
    fn test_examine() {
        assert_eq!(
            command("x 8000"),
            Command::Examine {
                addr: 0x8000,
                length: 1
            }
        );
        assert_eq!(
            command("examine 8000 16"),
            Command::Examine {
                addr: 0x8000,
                length: 16
            }
        );
        assert_eq!(
            command("x/4 0200"),
            Command::Examine {
                addr: 0x0200,
                length: 4
            }
        );
        assert!(parse("x/four 0200").is_err());
        assert!(parse("x GGGG").is_err());
    }

    #[test]
    fn test_list() {
        assert_eq!(command("list"), Command::List(None));
        assert_eq!(command("l loop"), Command::List(Some("loop".to_string())));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("info").unwrap_err(), "No info command");
        assert_eq!(parse("info bogus").unwrap_err(), "Unknown info command");
        assert_eq!(parse("frobnicate").unwrap_err(), "Unknown command");
        assert_eq!(parse("step 3").unwrap_err(), "Unknown command");
    }
}

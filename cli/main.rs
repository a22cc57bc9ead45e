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

mod commands;
mod render;

use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use gdb_6502::listing::DEFAULT_CONTEXT;
use gdb_6502::{DebugSession, ListingDocument, StopStatus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::{Command, Info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug server host
    #[arg(short, long, default_value = "::1")]
    address: String,

    /// Debug server port
    #[arg(short, long, default_value_t = 6502)]
    port: u16,

    /// Assembler listing used to show source around the program counter
    #[arg(short, long)]
    listing: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "gdb_6502=warn",
        1 => "gdb_6502=info",
        2 => "gdb_6502=debug",
        _ => "gdb_6502=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.parse()?))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/// Loads the listing at `path`. A missing file only costs source context.
fn load_listing(path: &Path) -> Result<Option<ListingDocument>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "listing not found, continuing without source");
            return Ok(None);
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let listing = ListingDocument::parse(&text)
        .with_context(|| format!("parsing listing {}", path.display()))?;
    info!(path = %path.display(), addresses = listing.len(), "loaded listing");
    Ok(Some(listing))
}

struct Debugger {
    session: DebugSession<Compat<TcpStream>>,
    listing: Option<ListingDocument>,
    /// Program counter from the most recent stop reply that carried one.
    last_pc: Option<u16>,
}

impl Debugger {
    async fn execute(&mut self, command: Command) -> gdb_6502::Result<ControlFlow<()>> {
        match command {
            Command::Help => println!("{}", commands::HELP),
            Command::Break => println!("Breakpoints are not supported"),
            Command::Halt => {
                let status = self.session.stop().await?;
                self.report(status);
            }
            Command::Step => {
                let status = self.session.step().await?;
                self.report(status);
            }
            Command::Continue => {
                let status = self.session.continue_().await?;
                self.report(status);
            }
            Command::Set { addr, value } => {
                if self.session.set_memory(addr, &[value]).await? {
                    println!("OK");
                } else {
                    println!("Failed to set memory");
                }
            }
            Command::Reset => {
                self.session.reset().await?;
                self.last_pc = None;
            }
            Command::Info(Info::Registers) => {
                let registers = self.session.get_registers().await?;
                print!("{}", render::registers(&registers));
            }
            Command::Info(Info::Peripherals) => {
                let peripherals = self.session.list_peripherals().await?;
                print!("{}", render::peripherals(&peripherals));
            }
            Command::Info(Info::Symbol(name)) => match &self.listing {
                Some(listing) => match listing.symbol(&name) {
                    Some(address) => println!("{name}: 0x{address:04X}"),
                    None => println!("No symbol {name}"),
                },
                None => println!("No listing loaded"),
            },
            Command::Examine { addr, length } => {
                let memory = self.session.get_memory(addr, length).await?;
                println!("{}", render::memory(&memory));
            }
            Command::List(target) => self.list(target.as_deref()).await?,
            Command::Quit => {
                println!("Quit");
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn report(&mut self, status: StopStatus) {
        println!("{status}");
        if let Some(pc) = status.address {
            self.last_pc = Some(pc);
            self.show_source(pc);
        }
    }

    fn show_source(&self, address: u16) {
        let Some(listing) = &self.listing else {
            return;
        };
        let window = listing.source_window_for_address(address, DEFAULT_CONTEXT);
        if window.is_empty() {
            println!("No source for 0x{address:04X}");
        } else {
            print!("{}", render::source_window(&window));
        }
    }

    async fn list(&mut self, target: Option<&str>) -> gdb_6502::Result<()> {
        let Some(listing) = &self.listing else {
            println!("No listing loaded");
            return Ok(());
        };
        let address = match target {
            Some(target) => {
                let address = listing.symbol(target).or_else(|| {
                    commands::parse_number(target)
                        .ok()
                        .and_then(|n| u16::try_from(n).ok())
                });
                match address {
                    Some(address) => address,
                    None => {
                        println!("Unknown symbol or address: {target}");
                        return Ok(());
                    }
                }
            }
            None => match self.last_pc {
                Some(pc) => pc,
                None => self.session.get_registers().await?.pc(),
            },
        };
        self.show_source(address);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let listing = match &cli.listing {
        Some(path) => load_listing(path)?,
        None => None,
    };

    let stream = TcpStream::connect((cli.address.as_str(), cli.port))
        .await
        .with_context(|| format!("connecting to {}:{}", cli.address, cli.port))?;
    info!(address = %cli.address, port = cli.port, "connected");

    let mut debugger = Debugger {
        session: DebugSession::connect(stream.compat()).await?,
        listing,
        last_pc: None,
    };

    match debugger.session.get_state().await {
        Ok(status) => debugger.report(status),
        Err(e) if e.is_fatal() => return Err(e).context("querying target state"),
        Err(e) => println!("Error: {e}"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!(">");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match commands::parse(line.trim()) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        match debugger.execute(command).await {
            Ok(ControlFlow::Continue(())) => {}
            Ok(ControlFlow::Break(())) => break,
            Err(e) if e.is_fatal() => return Err(e).context("debug session ended"),
            Err(e) => println!("Error: {e}"),
        }
    }

    Ok(())
}

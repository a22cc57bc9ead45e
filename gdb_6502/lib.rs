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

//! A GDB remote protocol client for emulated 6502 targets.
//!
//! This crate provides a [`DebugSession`] that drives a target over the
//! checksummed `$<payload>#<checksum>` packet protocol, and a
//! [`ListingDocument`] that maps addresses reported by the target back to
//! assembler source lines.
//!
//! The session uses the futures crate `AsyncRead` and `AsyncWrite` traits for
//! I/O to abstract the underlying transport. Requests are strictly one at a
//! time: every call sends a single packet and waits for its reply.
//!
//! # Example
//!
//! ```
//! use futures::io::{AsyncRead, AsyncWrite};
//! use gdb_6502::{DebugSession, ListingDocument, listing::DEFAULT_CONTEXT};
//!
//! async fn example<S>(stream: S, listing: &ListingDocument) -> gdb_6502::Result<()>
//! where
//!     S: AsyncRead + AsyncWrite + Unpin,
//! {
//!     let mut session = DebugSession::connect(stream).await?;
//!
//!     let status = session.step().await?;
//!     if let Some(pc) = status.address {
//!         for line in listing.source_window_for_address(pc, DEFAULT_CONTEXT).lines() {
//!             println!("{:>5} {}", line.index + 1, line.text);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod listing;
pub mod packet;
pub mod reply;
pub mod session;
pub mod transport;

pub use error::{Error, Result};
pub use listing::{FormatError, ListingDocument, SourceLine, SourceWindow};
pub use reply::{HaltState, Peripheral, Registers, StopStatus};
pub use session::DebugSession;
pub use transport::Transport;

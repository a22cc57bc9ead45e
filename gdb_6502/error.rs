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

use std::io;

use thiserror::Error;

use crate::listing::FormatError;

/// Errors surfaced by the debug session and the listing parser.
#[derive(Debug, Error)]
pub enum Error {
    /// The stream failed or was closed. Fatal to the session.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// A well-framed reply whose payload did not match the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The target answered with an `E` reply.
    #[error("target error: {0}")]
    Remote(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// A previous request never observed its reply, most likely because its
    /// future was dropped. The stream may still hold that reply.
    #[error("request `{command}` is still awaiting its reply")]
    RequestPending { command: &'static str },

    #[error("memory write of {0} bytes does not fit a single packet")]
    RequestTooLarge(usize),
}

impl Error {
    pub(crate) fn protocol(reason: &str, payload: &[u8]) -> Self {
        Error::Protocol(format!(
            "{reason}: {:?}",
            String::from_utf8_lossy(payload)
        ))
    }

    pub(crate) fn connection_closed() -> Self {
        Error::Connection(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Connection closed",
        ))
    }

    /// Returns true if the session can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::RequestPending { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

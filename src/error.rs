// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::client::Payload;
use snafu::Snafu;
use std::collections::HashMap;

/// Errors surfaced by every operation in this crate.
///
/// The transport backends translate their library-specific failures into this
/// one type, so callers see a single error model regardless of which backend
/// issued the exchange. Nothing in the crate retries or swallows a failure;
/// each variant is surfaced to the immediate caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The server answered with a status the request did not accept.
    ///
    /// Carries the full context of the exchange, including the decoded
    /// response body when one was available.
    #[snafu(display("{} {} failed with status {}", method, url, status))]
    Http {
        method: String,
        url: String,
        status: u16,
        headers: HashMap<String, String>,
        body: Option<Payload>,
    },

    /// The exchange was aborted before it settled, either by the caller
    /// triggering the canceler or by the configured timeout firing first.
    #[snafu(display("request was cancelled before it settled"))]
    Cancelled,

    /// The exchange failed before any status was available, e.g. a refused
    /// connection or a malformed response stream.
    #[snafu(display("{} {}: {}", method, url, message))]
    Connection {
        method: String,
        url: String,
        message: String,
    },

    /// The response body declared a JSON content type but did not parse, or a
    /// typed decode of an already-parsed payload failed.
    #[snafu(display("unable to decode response body: {}", source))]
    Decode { source: serde_json::Error },

    /// The base URL, path, and query parameters did not form a valid URL.
    #[snafu(display("invalid request URL {}: {}", url, message))]
    InvalidUrl { url: String, message: String },

    /// A field selection passed to the strict compiler used virtual-field
    /// presets the endpoint does not support. Raised synchronously, before
    /// any network I/O.
    #[snafu(display("unsupported field presets: {}", keys.join(", ")))]
    InvalidSelectors { keys: Vec<String> },
}

impl Error {
    /// Whether this error is an expected cancellation rather than a failure.
    ///
    /// Callers who cancel in-flight requests on their own (e.g. when tearing
    /// down a view) use this to drop the resulting rejection instead of
    /// reporting it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// The HTTP status of a rejected exchange, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

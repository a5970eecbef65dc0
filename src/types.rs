// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Contract shapes shared across endpoint families.
//!
//! All data structures returned by the API correspond directly to Rust data
//! structures via the serde interfaces; the field names on the wire are the
//! server's camelCase ones.

use serde::{Deserialize, Serialize};

/// Response body of `/system/info`, reduced to what this crate consumes.
#[derive(Clone, Debug, Deserialize)]
pub struct SystemInfo {
    pub version: String,
}

/// The wrapped response envelope some write endpoints return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T> {
    pub http_status: String,
    pub http_status_code: u16,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response: T,
}

/// Newer servers wrap some POST/PUT responses in a [ResponseEnvelope];
/// older ones return the payload bare. Inspecting the structure of the body
/// avoids branching on the API version.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum MaybeWrapped<T> {
    Wrapped(ResponseEnvelope<T>),
    Plain(T),
}

impl<T> MaybeWrapped<T> {
    pub fn into_inner(self) -> T {
        match self {
            MaybeWrapped::Wrapped(envelope) => envelope.response,
            MaybeWrapped::Plain(inner) => inner,
        }
    }
}

/// Per-object-type write statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
    pub ignored: u32,
    pub total: u32,
}

/// One validation failure inside a metadata import report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub message: String,
    #[serde(default)]
    pub main_klass: Option<String>,
    #[serde(default)]
    pub error_klass: Option<String>,
    #[serde(default)]
    pub error_property: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Job handle returned by asynchronous write endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncJobInfo {
    pub name: String,
    pub id: String,
    pub created: String,
    pub job_type: String,
    pub relative_notifier_endpoint: String,
}

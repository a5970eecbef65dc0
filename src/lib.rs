// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Generic typed client interfaces for DHIS2 web APIs.
//!
//! Callers build strongly-typed queries against the server's resource
//! collections (nested field selections via [fields::Fields], per-field
//! filters via [filter::Filters], paging) and issue them over HTTP through a
//! pluggable transport, receiving typed, cancelable responses.
//!
//! The pieces compose in one direction: the [fields] and [filter] compilers
//! turn a selection into the server's query-string mini-languages; a
//! [client::Request] carries them to a [client::HttpClient] backend (either
//! [surf_client::SurfClient] or [h1_client::H1Client], behind one
//! contract); the backend answers with a [response::CancelableResponse],
//! which can be mapped, chained, and cancelled before the exchange settles;
//! and collection endpoints normalize their heterogeneous paging envelopes
//! through [paging::normalize_paged].
//!
//! [api::Api] ties the pieces together for the common case:
//!
//! ```no_run
//! use dhis2_net::{Api, ApiOptions, Auth, Fields, Filter, Filters};
//!
//! # async fn example() -> Result<(), dhis2_net::Error> {
//! let api = Api::new(
//!     ApiOptions::default()
//!         .base_url("https://play.dhis2.org/demo")
//!         .auth(Auth::Basic {
//!             username: "admin".into(),
//!             password: "district".into(),
//!         }),
//! );
//!
//! let query = dhis2_net::model::GetOptions {
//!     fields: Fields::new().field("id").field("name"),
//!     filters: Some(Filters::new().with("name", Filter::like("ANC"))),
//!     ..Default::default()
//! };
//! let elements = api
//!     .model("dataElements")
//!     .get::<serde_json::Value>(&query)
//!     .data()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Responses are deferred: nothing is sent until the caller consumes the
//! handle, and a caller who takes the [response::Canceler] first can abort
//! the exchange while it is in flight. There is no caching and no retrying
//! anywhere in this crate; both are left to callers.

pub mod api;
pub mod client;
pub mod data_store;
pub mod error;
pub mod fields;
pub mod filter;
pub mod h1_client;
pub mod metadata;
pub mod mock;
pub mod model;
pub mod paging;
pub mod response;
pub mod surf_client;
pub mod tracker;
pub mod types;

pub use api::{Api, ApiOptions, Backend};
pub use client::{
    validate_2xx, validate_404, Auth, Body, ClientOptions, HttpClient, HttpResponse, Method,
    Params, ParamValue, Payload, Request, ResponseType,
};
pub use error::{Error, Result};
pub use fields::{Field, Fields, Transformer};
pub use filter::{Filter, Filters};
pub use paging::{PagedResult, Pager};
pub use response::{CancelableResponse, Canceler};
pub use types::*;

// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The transport abstraction shared by every backend.
//!
//! A backend is anything implementing [HttpClient]: it takes one [Request]
//! and returns a [CancelableResponse] over the uniform [Payload] shape. The
//! two bundled backends ([crate::surf_client::SurfClient] and
//! [crate::h1_client::H1Client]) sit on materially different I/O primitives,
//! so the uniform contract (error type, response shape, cancellation
//! semantics) is enforced in each of them independently; this module holds
//! the pieces they agree on.

use crate::error::{DecodeSnafu, Error, Result};
use crate::response::CancelableResponse;
use http_types::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{event, Level};

pub use http_types::Method;

/// One query parameter value: a single scalar or a repeated list.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Many(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Ordered query parameters. Lists serialize as repeated keys
/// (`k=v1&k=v2`), never as bracketed or comma-joined forms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ParamValue)> {
        self.0.iter()
    }

    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }
}

/// Request body: JSON by default, or raw bytes for binary uploads.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Raw(Vec<u8>),
}

/// How the response body should be decoded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResponseType {
    /// Parse as JSON; fall back to plain text when the content type is not
    /// JSON and parsing fails.
    Json,
    /// Hand back the undecoded bytes.
    Raw,
}

/// Accept any 2xx status. The default acceptance predicate.
pub fn validate_2xx(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Accept 2xx and 404. Used by idempotent existence checks (the data store
/// wrapper) to distinguish "absent" from "error".
pub fn validate_404(status: u16) -> bool {
    validate_2xx(status) || status == 404
}

/// One HTTP exchange, described independently of the backend issuing it.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    /// Path relative to the connection's base URL.
    pub url: String,
    pub params: Params,
    pub body: Option<Body>,
    pub response_type: ResponseType,
    /// Statuses this predicate rejects become [Error::Http] rejections.
    pub validate_status: fn(u16) -> bool,
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Params::new(),
            body: None,
            response_type: ResponseType::Json,
            validate_status: validate_2xx,
            timeout: None,
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Attach a JSON body. Serialization failures reject at request time,
    /// mirroring how transport failures surface.
    pub fn json(mut self, data: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(data).context(DecodeSnafu)?;
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    pub fn raw_body(mut self, bytes: Vec<u8>) -> Self {
        self.body = Some(Body::Raw(bytes));
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn validate_status(mut self, predicate: fn(u16) -> bool) -> Self {
        self.validate_status = predicate;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// The uniform response shape: status, decoded data, lowercased headers.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse<T> {
    pub status: u16,
    pub data: T,
    pub headers: HashMap<String, String>,
}

/// A decoded response body before typed deserialization.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    /// Deserialize into a concrete type. Text payloads deserialize as JSON
    /// strings, so `T = String` keeps working for non-JSON responses.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            Payload::Json(value) => value,
            Payload::Text(text) => serde_json::Value::String(text),
            Payload::Bytes(bytes) => serde_json::from_slice(&bytes).context(DecodeSnafu)?,
        };
        serde_json::from_value(value).context(DecodeSnafu)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Json(value) => value.to_string().into_bytes(),
            Payload::Text(text) => text.into_bytes(),
            Payload::Bytes(bytes) => bytes,
        }
    }
}

impl CancelableResponse<Payload> {
    /// Decode the payload into `T`, preserving status and headers.
    pub fn json<T: DeserializeOwned + Send + 'static>(self) -> CancelableResponse<T> {
        self.try_map(|response| response.data.into_json())
    }

    /// Resolve to the raw response bytes.
    pub fn bytes(self) -> CancelableResponse<Vec<u8>> {
        self.map(|response| response.data.into_bytes())
    }
}

/// Credentials attached to every request a connection issues.
#[derive(Clone, Debug)]
pub enum Auth {
    Basic { username: String, password: String },
    /// A personal access token, sent with the `ApiToken` scheme.
    PersonalToken(String),
}

impl Auth {
    pub fn header(&self) -> (String, String) {
        use base64::Engine;
        let value = match self {
            Auth::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                format!(
                    "Basic {}",
                    base64::engine::general_purpose::STANDARD.encode(credentials)
                )
            }
            Auth::PersonalToken(token) => format!("ApiToken {}", token),
        };
        ("authorization".to_string(), value)
    }
}

/// Per-connection configuration shared by both backends.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    pub base_url: String,
    pub auth: Option<Auth>,
    /// Default timeout for requests that do not set their own.
    pub timeout: Option<Duration>,
}

/// A pluggable network backend issuing single HTTP exchanges.
///
/// Implementations must satisfy the identical contract: the uniform error
/// type, the uniform [HttpResponse] shape, lazy execution, and cooperative
/// cancellation where aborting an already-settled exchange is a no-op.
pub trait HttpClient: Send + Sync {
    fn send(&self, request: Request) -> CancelableResponse<Payload>;
}

/// Join URL segments with single separators, dropping empty segments.
pub fn join_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the full request URL: base joined with the relative path, query
/// parameters appended with repeated keys for lists.
pub fn build_url(base_url: &str, path: &str, params: &Params) -> Result<Url> {
    let joined = join_path(&[base_url, path]);
    let mut url = Url::parse(&joined).map_err(|err| Error::InvalidUrl {
        url: joined.clone(),
        message: err.to_string(),
    })?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params.iter() {
            match value {
                ParamValue::Single(single) => {
                    pairs.append_pair(key, single);
                }
                ParamValue::Many(many) => {
                    for item in many {
                        pairs.append_pair(key, item);
                    }
                }
            }
        }
    }
    Ok(url)
}

/// The charset declared by a `content-type` header value, defaulting to
/// utf-8 when unspecified.
pub(crate) fn charset_of(content_type: &str) -> String {
    content_type
        .split(';')
        .filter_map(|part| {
            let mut halves = part.splitn(2, '=');
            let name = halves.next().map(str::trim);
            let value = halves.next().map(str::trim);
            match (name, value) {
                (Some("charset"), Some(value)) => Some(value.to_lowercase()),
                _ => None,
            }
        })
        .next()
        .unwrap_or_else(|| "utf-8".to_string())
}

/// Best-effort diagnostic on a failed exchange. Logging only; never fails.
pub(crate) fn log_request_failure(method: Method, url: &str, body: &Payload) {
    let rendered = match body {
        Payload::Json(value) => value.to_string(),
        Payload::Text(text) => text.clone(),
        Payload::Bytes(bytes) => format!("<{} raw bytes>", bytes.len()),
    };
    event!(
        Level::ERROR,
        "[dhis2-net:request] {} {} failed: {}",
        method,
        url,
        rendered
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_drops_duplicate_separators() {
        assert_eq!(
            join_path(&["http://host:8080/", "/api", "38"]),
            "http://host:8080/api/38"
        );
        assert_eq!(join_path(&["http://host", "", "api"]), "http://host/api");
    }

    #[test]
    fn arrays_serialize_as_repeated_keys() {
        let params = Params::new().with("tags", vec!["x", "y"]).with("page", 2u32);
        let url = build_url("http://host", "/things", &params).unwrap();
        assert_eq!(url.query(), Some("tags=x&tags=y&page=2"));
    }

    #[test]
    fn build_url_rejects_garbage() {
        let err = build_url("not a url", "/x", &Params::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn charset_defaults_to_utf8() {
        assert_eq!(charset_of("application/json"), "utf-8");
        assert_eq!(
            charset_of("application/json; charset=ISO-8859-1"),
            "iso-8859-1"
        );
    }

    #[test]
    fn basic_auth_encodes_credentials() {
        let auth = Auth::Basic {
            username: "admin".to_string(),
            password: "district".to_string(),
        };
        let (name, value) = auth.header();
        assert_eq!(name, "authorization");
        assert_eq!(value, "Basic YWRtaW46ZGlzdHJpY3Q=");
    }

    #[test]
    fn personal_token_uses_api_token_scheme() {
        let auth = Auth::PersonalToken("d2pat_abc".to_string());
        assert_eq!(auth.header().1, "ApiToken d2pat_abc");
    }
}

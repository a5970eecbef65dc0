// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The low-level backend, driving [http_client]'s async-h1 client directly.
//!
//! The underlying primitive has no timeout, no status validation, and no
//! body decoding of its own, so this backend implements the whole transport
//! contract by hand: query-string serialization with repeated keys, a timer
//! that aborts the in-flight exchange when it fires first, charset- and
//! content-type-aware body decoding with a plain-text fallback, and explicit
//! construction of the uniform error on a rejected status.

use crate::client::{
    build_url, charset_of, log_request_failure, Body, ClientOptions, HttpClient, HttpResponse,
    Payload, Request, ResponseType,
};
use crate::error::{Error, Result};
use crate::response::{CancelableResponse, Canceler};
use futures::future::{select, AbortHandle, Abortable, Either};
use http_client::h1::H1Client as NativeClient;
use http_client::HttpClient as _;
use http_types::headers::HeaderName;
use http_types::Url;
use std::collections::HashMap;
use std::sync::Arc;

/// A [HttpClient] backend over the fetch-style [http_client] primitive.
#[derive(Clone, Debug)]
pub struct H1Client {
    client: Arc<NativeClient>,
    options: ClientOptions,
}

impl H1Client {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            client: Arc::new(NativeClient::new()),
            options,
        }
    }
}

impl HttpClient for H1Client {
    fn send(&self, request: Request) -> CancelableResponse<Payload> {
        let url = match build_url(&self.options.base_url, &request.url, &request.params) {
            Ok(url) => url,
            Err(err) => return CancelableResponse::failed(err),
        };

        let client = self.client.clone();
        let options = self.options.clone();
        let timeout = request.timeout.or(options.timeout);

        let (handle, registration) = AbortHandle::new_pair();
        let timer_handle = handle.clone();
        let cancel: Canceler = Arc::new(move || handle.abort());

        let response = move || async move {
            let exchange = Box::pin(Abortable::new(
                perform(client, options, request, url),
                registration,
            ));
            let result = match timeout {
                // No native deadline either: a timer aborts the exchange if
                // it fires first, indistinguishable from a caller cancel.
                Some(duration) => {
                    let timer = Box::pin(async_std::task::sleep(duration));
                    match select(exchange, timer).await {
                        Either::Left((result, _timer)) => result,
                        Either::Right(((), exchange)) => {
                            timer_handle.abort();
                            exchange.await
                        }
                    }
                }
                None => exchange.await,
            };
            match result {
                Ok(inner) => inner,
                Err(_aborted) => Err(Error::Cancelled),
            }
        };

        CancelableResponse::build(Some(cancel), response)
    }
}

async fn perform(
    client: Arc<NativeClient>,
    options: ClientOptions,
    request: Request,
    url: Url,
) -> Result<HttpResponse<Payload>> {
    let method = request.method;
    let url_text = url.to_string();

    let connection_error = |message: String| {
        log_request_failure(method, &url_text, &Payload::Text(message.clone()));
        Error::Connection {
            method: method.to_string(),
            url: url_text.clone(),
            message,
        }
    };

    let mut req = http_types::Request::new(method, url.clone());
    req.insert_header("accept", "application/json, text/plain");
    if let Some(auth) = &options.auth {
        let (name, value) = auth.header();
        insert_header(&mut req, &name, &value)?;
    }
    for (name, value) in &request.headers {
        insert_header(&mut req, name, value)?;
    }
    match &request.body {
        Some(Body::Json(value)) => {
            req.insert_header("content-type", "application/json;charset=UTF-8");
            let body = http_types::Body::from_json(value)
                .map_err(|err| connection_error(err.to_string()))?;
            req.set_body(body);
        }
        Some(Body::Raw(bytes)) => req.set_body(http_types::Body::from_bytes(bytes.clone())),
        None => {}
    }

    let mut res = client
        .send(req)
        .await
        .map_err(|err| connection_error(err.to_string()))?;

    let status: u16 = res.status().into();
    let mut headers = HashMap::new();
    for (name, values) in res.iter() {
        headers.insert(name.as_str().to_lowercase(), values.last().to_string());
    }

    let bytes = res
        .take_body()
        .into_bytes()
        .await
        .map_err(|err| connection_error(err.to_string()))?;
    let data = decode(&headers, bytes, request.response_type)?;

    if !(request.validate_status)(status) {
        log_request_failure(method, &url_text, &data);
        return Err(Error::Http {
            method: method.to_string(),
            url: url_text,
            status,
            headers,
            body: Some(data),
        });
    }

    Ok(HttpResponse {
        status,
        data,
        headers,
    })
}

fn insert_header(req: &mut http_types::Request, name: &str, value: &str) -> Result<()> {
    let name = name
        .parse::<HeaderName>()
        .map_err(|err| Error::Connection {
            method: req.method().to_string(),
            url: req.url().to_string(),
            message: format!("invalid header name {}: {}", name, err),
        })?;
    req.insert_header(name, value);
    Ok(())
}

/// Manual body decoding: inspect the declared charset and content type,
/// prefer JSON, fall back to plain text when the content type is not JSON,
/// and fail only when a declared-JSON body does not parse.
fn decode(
    headers: &HashMap<String, String>,
    bytes: Vec<u8>,
    response_type: ResponseType,
) -> Result<Payload> {
    if let ResponseType::Raw = response_type {
        return Ok(Payload::Bytes(bytes));
    }

    let content_type = headers.get("content-type").map(String::as_str);
    let charset = charset_of(content_type.unwrap_or(""));
    // The server side of this API emits UTF-8; a stray legacy charset label
    // still decodes as text rather than failing the whole exchange.
    let text = if charset == "utf-8" || charset == "utf8" {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        bytes.iter().map(|byte| *byte as char).collect()
    };

    match serde_json::from_str(&text) {
        Ok(value) => Ok(Payload::Json(value)),
        Err(err) => {
            if content_type.map_or(false, |value| value.contains("json")) {
                Err(Error::Decode { source: err })
            } else {
                Ok(Payload::Text(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers_with(content_type: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        headers
    }

    #[test]
    fn json_bodies_parse() {
        let payload = decode(
            &headers_with("application/json; charset=utf-8"),
            br#"{"a":1}"#.to_vec(),
            ResponseType::Json,
        )
        .unwrap();
        assert_eq!(payload, Payload::Json(json!({"a": 1})));
    }

    #[test]
    fn non_json_content_falls_back_to_text() {
        let payload = decode(
            &headers_with("text/plain"),
            b"pong".to_vec(),
            ResponseType::Json,
        )
        .unwrap();
        assert_eq!(payload, Payload::Text("pong".to_string()));
    }

    #[test]
    fn declared_json_that_does_not_parse_is_a_decode_error() {
        let err = decode(
            &headers_with("application/json"),
            b"<html>".to_vec(),
            ResponseType::Json,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn raw_mode_returns_bytes_untouched() {
        let payload = decode(
            &headers_with("application/octet-stream"),
            vec![0, 159, 146, 150],
            ResponseType::Raw,
        )
        .unwrap();
        assert_eq!(payload, Payload::Bytes(vec![0, 159, 146, 150]));
    }

    #[test]
    fn latin1_charset_still_decodes_as_text() {
        let payload = decode(
            &headers_with("text/plain; charset=ISO-8859-1"),
            vec![0x63, 0x61, 0x66, 0xE9],
            ResponseType::Json,
        )
        .unwrap();
        assert_eq!(payload, Payload::Text("café".to_string()));
    }
}

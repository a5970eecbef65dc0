// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The high-level backend, driving [surf].
//!
//! surf brings its own connection handling and error model; this backend's
//! job is translating between that model and the uniform transport contract:
//! surf errors become [Error::Connection], non-accepted statuses become
//! [Error::Http] with full request context, and cancellation and timeout
//! both reject with [Error::Cancelled].

use crate::client::{
    build_url, log_request_failure, Body, ClientOptions, HttpClient, HttpResponse, Payload,
    Request, ResponseType,
};
use crate::error::{Error, Result};
use crate::response::{CancelableResponse, Canceler};
use futures::future::{AbortHandle, Abortable};
use http_types::headers::HeaderName;
use http_types::Url;
use std::collections::HashMap;
use std::sync::Arc;

/// A [HttpClient] backend over [surf::Client].
#[derive(Clone, Debug)]
pub struct SurfClient {
    client: surf::Client,
    options: ClientOptions,
}

impl SurfClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            client: surf::Client::new(),
            options,
        }
    }
}

impl HttpClient for SurfClient {
    fn send(&self, request: Request) -> CancelableResponse<Payload> {
        let url = match build_url(&self.options.base_url, &request.url, &request.params) {
            Ok(url) => url,
            Err(err) => return CancelableResponse::failed(err),
        };

        let client = self.client.clone();
        let options = self.options.clone();
        let timeout = request.timeout.or(options.timeout);

        let (handle, registration) = AbortHandle::new_pair();
        let abort = handle;
        let cancel: Canceler = Arc::new(move || abort.abort());

        let response = move || async move {
            let exchange = Abortable::new(perform(client, options, request, url), registration);
            let guarded = async move {
                match exchange.await {
                    Ok(result) => result,
                    Err(_aborted) => Err(Error::Cancelled),
                }
            };
            match timeout {
                // surf has no native deadline; racing the executor's timer is
                // the library-level equivalent, and losing the race rejects
                // exactly like an explicit cancellation.
                Some(duration) => async_std::future::timeout(duration, guarded)
                    .await
                    .unwrap_or_else(|_| Err(Error::Cancelled)),
                None => guarded.await,
            }
        };

        CancelableResponse::build(Some(cancel), response)
    }
}

async fn perform(
    client: surf::Client,
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

    let mut req = surf::Request::new(method, url.clone());
    req.set_header("accept", "application/json, text/plain");
    if let Some(auth) = &options.auth {
        let (name, value) = auth.header();
        set_header(&mut req, &name, &value)?;
    }
    for (name, value) in &request.headers {
        set_header(&mut req, name, value)?;
    }
    match &request.body {
        Some(Body::Json(value)) => {
            let body = surf::Body::from_json(value)
                .map_err(|err| connection_error(err.to_string()))?;
            req.set_body(body);
        }
        Some(Body::Raw(bytes)) => req.set_body(surf::Body::from_bytes(bytes.clone())),
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
        .body_bytes()
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

fn set_header(req: &mut surf::Request, name: &str, value: &str) -> Result<()> {
    let name = name
        .parse::<HeaderName>()
        .map_err(|err| Error::Connection {
            method: req.method().to_string(),
            url: req.url().to_string(),
            message: format!("invalid header name {}: {}", name, err),
        })?;
    req.set_header(name, value);
    Ok(())
}

// surf parses JSON bodies itself, but reading the bytes once lets non-JSON
// responses fall back to text instead of consuming the body stream twice.
fn decode(
    headers: &HashMap<String, String>,
    bytes: Vec<u8>,
    response_type: ResponseType,
) -> Result<Payload> {
    match response_type {
        ResponseType::Raw => Ok(Payload::Bytes(bytes)),
        ResponseType::Json => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            match serde_json::from_str(&text) {
                Ok(value) => Ok(Payload::Json(value)),
                Err(err) => {
                    let content_type = headers.get("content-type").map(String::as_str);
                    if content_type.map_or(false, |value| value.contains("json")) {
                        Err(Error::Decode { source: err })
                    } else {
                        Ok(Payload::Text(text))
                    }
                }
            }
        }
    }
}

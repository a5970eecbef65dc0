// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! An in-memory transport for tests.
//!
//! [MockClient] implements [HttpClient] without touching the network:
//! stubbed responses are consumed in FIFO order, every issued request is
//! recorded for inspection, and a hit counter exposes whether producers ran
//! at all, which is what the cancellation tests assert on. The mock honors
//! the same contract as the real backends: lazy producers, status
//! validation, and cooperative cancellation.

use crate::client::{HttpClient, HttpResponse, Payload, Request};
use crate::error::{Error, Result};
use crate::response::{CancelableResponse, Canceler};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A canned response the mock will serve.
#[derive(Clone, Debug)]
pub struct Stub {
    pub status: u16,
    pub payload: Payload,
    pub headers: HashMap<String, String>,
}

impl Stub {
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/json;charset=UTF-8".to_string(),
        );
        Self {
            status,
            payload: Payload::Json(body),
            headers,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        Self {
            status,
            payload: Payload::Text(body.into()),
            headers,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A recorded exchange: enough of the request to assert on.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub params: Vec<(String, Vec<String>)>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct State {
    stubs: Mutex<VecDeque<Stub>>,
    requests: Mutex<Vec<RecordedRequest>>,
    hits: AtomicUsize,
}

/// An [HttpClient] serving stubbed responses in order.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<State>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a canned response.
    pub fn stub(&self, stub: Stub) -> &Self {
        if let Ok(mut stubs) = self.state.stubs.lock() {
            stubs.push_back(stub);
        }
        self
    }

    /// Queue a JSON response.
    pub fn stub_json(&self, status: u16, body: Value) -> &Self {
        self.stub(Stub::json(status, body))
    }

    /// How many producers actually executed.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Every request the mock has served, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for MockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClient")
            .field("hits", &self.hits())
            .finish()
    }
}

impl HttpClient for MockClient {
    fn send(&self, request: Request) -> CancelableResponse<Payload> {
        let state = self.state.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let cancel: Canceler = Arc::new(move || flag.store(true, Ordering::SeqCst));

        let response = move || async move {
            if cancelled.load(Ordering::SeqCst) {
                return Err(Error::Cancelled);
            }
            state.hits.fetch_add(1, Ordering::SeqCst);
            record(&state, &request);
            serve(&state, &request)
        };

        CancelableResponse::build(Some(cancel), response)
    }
}

fn record(state: &State, request: &Request) {
    let params = request
        .params
        .iter()
        .map(|(key, value)| {
            let values = match value {
                crate::client::ParamValue::Single(single) => vec![single.clone()],
                crate::client::ParamValue::Many(many) => many.clone(),
            };
            (key.clone(), values)
        })
        .collect();
    let body = match &request.body {
        Some(crate::client::Body::Json(value)) => Some(value.clone()),
        _ => None,
    };
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(RecordedRequest {
            method: request.method.to_string(),
            url: request.url.clone(),
            params,
            body,
        });
    }
}

fn serve(state: &State, request: &Request) -> Result<HttpResponse<Payload>> {
    let stub = state
        .stubs
        .lock()
        .ok()
        .and_then(|mut stubs| stubs.pop_front());
    let stub = match stub {
        Some(stub) => stub,
        None => {
            return Err(Error::Connection {
                method: request.method.to_string(),
                url: request.url.clone(),
                message: "no stubbed response left".to_string(),
            })
        }
    };

    if !(request.validate_status)(stub.status) {
        return Err(Error::Http {
            method: request.method.to_string(),
            url: request.url.clone(),
            status: stub.status,
            headers: stub.headers,
            body: Some(stub.payload),
        });
    }

    Ok(HttpResponse {
        status: stub.status,
        data: stub.payload,
        headers: stub.headers,
    })
}

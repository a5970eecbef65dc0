// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! A deferred, abortable, composable handle to one HTTP exchange.
//!
//! A [CancelableResponse] pairs a cancellation trigger with a producer of the
//! exchange's eventual result. The producer is not run until the caller
//! consumes the handle through [response](CancelableResponse::response) or
//! [data](CancelableResponse::data), so building and transforming a response
//! performs no I/O. Transformations compose with
//! [map](CancelableResponse::map), [try_map](CancelableResponse::try_map) and
//! [flat_map](CancelableResponse::flat_map); each wrapping preserves the
//! ability to cancel whichever stage is in flight.

use crate::client::HttpResponse;
use crate::error::{Error, Result};
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex};

/// A shared, no-argument cancellation trigger.
///
/// Triggers are cooperative: invoking one asks the underlying transport to
/// abort the exchange, and invoking it after the exchange has settled is a
/// no-op rather than an error.
pub type Canceler = Arc<dyn Fn() + Send + Sync>;

/// A trigger that does nothing, for responses with nothing to abort.
pub fn noop_canceler() -> Canceler {
    Arc::new(|| {})
}

type Producer<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<HttpResponse<T>>> + Send>;

/// A deferred, cancelable HTTP exchange resolving to an [HttpResponse].
pub struct CancelableResponse<T> {
    cancel: Canceler,
    response: Producer<T>,
}

impl<T: Send + 'static> CancelableResponse<T> {
    /// Wrap a producer, using a no-op trigger when none is supplied.
    pub fn build<F, Fut>(cancel: Option<Canceler>, response: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<HttpResponse<T>>> + Send + 'static,
    {
        Self {
            cancel: cancel.unwrap_or_else(noop_canceler),
            response: Box::new(move || response().boxed()),
        }
    }

    /// A response that is already settled. Nothing to cancel.
    pub fn ready(result: Result<HttpResponse<T>>) -> Self {
        Self::build(None, move || async move { result })
    }

    /// A response that rejects immediately with `error`.
    pub fn failed(error: Error) -> Self {
        Self::ready(Err(error))
    }

    /// A clone of the cancellation trigger.
    ///
    /// Consuming the response moves it, so callers that may need to abort
    /// mid-flight take the trigger first.
    pub fn canceler(&self) -> Canceler {
        self.cancel.clone()
    }

    /// Ask the underlying transport to abort the exchange.
    pub fn cancel(&self) {
        (self.cancel)()
    }

    /// Trigger execution and return the future holding the full response.
    ///
    /// Each handle executes at most once; nothing is memoized. Dropping the
    /// returned future without polling it issues no request.
    pub fn response(self) -> BoxFuture<'static, Result<HttpResponse<T>>> {
        (self.response)()
    }

    /// Trigger execution and resolve to the response data alone.
    pub async fn data(self) -> Result<T> {
        Ok(self.response().await?.data)
    }

    /// Transform the response data, keeping status and headers untouched.
    ///
    /// The mapper sees the whole response so it can branch on the status
    /// (e.g. mapping an accepted 404 to a default). The cancellation trigger
    /// is reused unchanged.
    pub fn map<U, F>(self, f: F) -> CancelableResponse<U>
    where
        U: Send + 'static,
        F: FnOnce(HttpResponse<T>) -> U + Send + 'static,
    {
        self.try_map(move |response| Ok(f(response)))
    }

    /// Like [map](Self::map), for mappers that can fail. An `Err` from the
    /// mapper rejects the resulting future.
    pub fn try_map<U, F>(self, f: F) -> CancelableResponse<U>
    where
        U: Send + 'static,
        F: FnOnce(HttpResponse<T>) -> Result<U> + Send + 'static,
    {
        let CancelableResponse { cancel, response } = self;
        CancelableResponse {
            cancel,
            response: Box::new(move || {
                async move {
                    let res = response().await?;
                    let status = res.status;
                    let headers = res.headers.clone();
                    let data = f(res)?;
                    Ok(HttpResponse {
                        status,
                        data,
                        headers,
                    })
                }
                .boxed()
            }),
        }
    }

    /// Chain a second exchange derived from the first response.
    ///
    /// Stage two starts only after stage one settles. The combined trigger
    /// fires stage one's trigger and, once stage two has been reached, stage
    /// two's as well, so cancelling mid-chain interrupts whichever stage is
    /// in flight. Cancelling before stage one settles prevents stage two's
    /// producer from ever running.
    pub fn flat_map<U, F>(self, f: F) -> CancelableResponse<U>
    where
        U: Send + 'static,
        F: FnOnce(HttpResponse<T>) -> CancelableResponse<U> + Send + 'static,
    {
        let CancelableResponse { cancel, response } = self;
        let second_trigger: Arc<Mutex<Option<Canceler>>> = Arc::new(Mutex::new(None));

        let slot = second_trigger.clone();
        let mapped: Producer<U> = Box::new(move || {
            async move {
                let res = response().await?;
                let next = f(res);
                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(next.canceler());
                }
                next.response().await
            }
            .boxed()
        });

        let cancel_all: Canceler = Arc::new(move || {
            cancel();
            if let Ok(slot) = second_trigger.lock() {
                if let Some(second) = slot.as_ref() {
                    second();
                }
            }
        });

        CancelableResponse {
            cancel: cancel_all,
            response: mapped,
        }
    }
}

// Producers are boxed closures, so all a Debug impl can usefully show is the
// presence of the handle.
impl<T> std::fmt::Debug for CancelableResponse<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelableResponse").finish()
    }
}

// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The key-value data store endpoints.
//!
//! The store distinguishes "absent" from "error" by accepting 404 through
//! the status predicate and branching on the status afterwards, so a missing
//! namespace or key never rejects. Saving writes with PUT and falls back to
//! POST when the key does not exist yet.

use crate::api::Api;
use crate::client::{validate_404, Request};
use crate::response::CancelableResponse;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Whether a store is shared or scoped to the authenticated user.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DataStoreScope {
    Global,
    User,
}

impl DataStoreScope {
    fn prefix(self) -> &'static str {
        match self {
            DataStoreScope::Global => "/dataStore",
            DataStoreScope::User => "/userDataStore",
        }
    }
}

/// One namespace of the key-value store.
#[derive(Clone, Debug)]
pub struct DataStore<'a> {
    api: &'a Api,
    scope: DataStoreScope,
    namespace: String,
}

impl<'a> DataStore<'a> {
    pub(crate) fn new(api: &'a Api, scope: DataStoreScope, namespace: impl Into<String>) -> Self {
        Self {
            api,
            scope,
            namespace: namespace.into(),
        }
    }

    fn namespace_url(&self) -> String {
        format!("{}/{}", self.scope.prefix(), self.namespace)
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/{}", self.namespace_url(), key)
    }

    /// Every key in the namespace; an absent namespace is an empty list.
    pub fn keys(&self) -> CancelableResponse<Vec<String>> {
        self.api
            .send(Request::get(self.namespace_url()).validate_status(validate_404))
            .try_map(|response| {
                if response.status == 404 {
                    Ok(Vec::new())
                } else {
                    response.data.into_json()
                }
            })
    }

    /// The value under `key`, or `None` when absent.
    pub fn get<T>(&self, key: &str) -> CancelableResponse<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.api
            .send(Request::get(self.key_url(key)).validate_status(validate_404))
            .try_map(|response| {
                if response.status == 404 {
                    Ok(None)
                } else {
                    response.data.into_json().map(Some)
                }
            })
    }

    /// Create or replace the value under `key`.
    ///
    /// The store's PUT rejects unknown keys instead of upserting, so a 404
    /// chains into the creating POST; cancelling mid-chain aborts whichever
    /// of the two exchanges is in flight.
    pub fn save(&self, key: &str, value: &impl Serialize) -> CancelableResponse<()> {
        let url = self.key_url(key);
        let put = match Request::put(url.as_str())
            .validate_status(validate_404)
            .json(value)
        {
            Ok(request) => request,
            Err(err) => return CancelableResponse::failed(err),
        };
        let body = put.body.clone();
        let connection = self.api.connection();

        self.api
            .send(put)
            .flat_map(move |response| {
                if response.status == 404 {
                    let mut post = Request::post(url);
                    post.body = body;
                    connection.send(post)
                } else {
                    CancelableResponse::ready(Ok(response))
                }
            })
            .map(|_| ())
    }

    /// Remove `key`. Resolves to whether the key existed.
    pub fn delete(&self, key: &str) -> CancelableResponse<bool> {
        self.api
            .send(Request::delete(self.key_url(key)).validate_status(validate_404))
            .map(|response| response.status != 404)
    }
}

// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The API entry point.
//!
//! An [Api] owns two connections over the chosen backend: one rooted at the
//! server's base URL and one rooted at the versioned API path (`<base>/api`
//! or `<base>/api/<version>`). Requests go through the API connection unless
//! issued with [Api::send_root]. Sub-resource wrappers are cheap borrowed
//! handles created on access; they hold a plain back-reference to their
//! owner and carry no state of their own.

use crate::client::{
    join_path, Auth, ClientOptions, HttpClient, Params, Payload, Request,
};
use crate::data_store::{DataStore, DataStoreScope};
use crate::error::Result;
use crate::h1_client::H1Client;
use crate::metadata::Metadata;
use crate::model::Model;
use crate::response::CancelableResponse;
use crate::surf_client::SurfClient;
use crate::tracker::Tracker;
use crate::types::SystemInfo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Which transport backend a connection uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Backend {
    /// The low-level async-h1 backend. The default.
    H1,
    /// The high-level surf backend.
    Surf,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::H1
    }
}

/// Configuration for [Api::new].
#[derive(Clone, Debug)]
pub struct ApiOptions {
    pub base_url: String,
    /// Pins requests to `<base>/api/<version>` instead of `<base>/api`.
    pub api_version: Option<u32>,
    pub auth: Option<Auth>,
    pub backend: Backend,
    /// Default timeout applied to every request without its own.
    pub timeout: Option<Duration>,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_version: None,
            auth: None,
            backend: Backend::default(),
            timeout: None,
        }
    }
}

impl ApiOptions {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn api_version(mut self, version: u32) -> Self {
        self.api_version = Some(version);
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A typed client for one DHIS2 server.
#[derive(Clone)]
pub struct Api {
    base_url: String,
    api_path: String,
    base_connection: Arc<dyn HttpClient>,
    api_connection: Arc<dyn HttpClient>,
}

impl Api {
    pub fn new(options: ApiOptions) -> Self {
        let version = options.api_version.map(|version| version.to_string());
        let api_path = join_path(&[
            &options.base_url,
            "api",
            version.as_deref().unwrap_or(""),
        ]);

        let connect = |base_url: String| -> Arc<dyn HttpClient> {
            let client_options = ClientOptions {
                base_url,
                auth: options.auth.clone(),
                timeout: options.timeout,
            };
            match options.backend {
                Backend::H1 => Arc::new(H1Client::new(client_options)),
                Backend::Surf => Arc::new(SurfClient::new(client_options)),
            }
        };
        let base_connection = connect(options.base_url.clone());
        let api_connection = connect(api_path.clone());

        Self {
            base_url: options.base_url,
            api_path,
            base_connection,
            api_connection,
        }
    }

    /// Build an [Api] over an externally supplied transport, e.g. a
    /// [crate::mock::MockClient]. Both connections share the client; URL
    /// prefixing is left to the transport.
    pub fn with_client(client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: String::new(),
            api_path: String::new(),
            base_connection: client.clone(),
            api_connection: client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_path(&self) -> &str {
        &self.api_path
    }

    pub(crate) fn connection(&self) -> Arc<dyn HttpClient> {
        self.api_connection.clone()
    }

    /// Issue a request against the versioned API path.
    pub fn send(&self, request: Request) -> CancelableResponse<Payload> {
        self.api_connection.send(request)
    }

    /// Issue a request against the bare server root, for the few endpoints
    /// living outside `/api`.
    pub fn send_root(&self, request: Request) -> CancelableResponse<Payload> {
        self.base_connection.send(request)
    }

    /// Issue a request and decode the JSON response into `T`.
    pub fn request<T>(&self, request: Request) -> CancelableResponse<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.send(request).json()
    }

    pub fn get<T>(&self, url: impl Into<String>, params: Params) -> CancelableResponse<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(Request::get(url).params(params))
    }

    pub fn post<T>(
        &self,
        url: impl Into<String>,
        params: Params,
        data: &impl Serialize,
    ) -> CancelableResponse<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match Request::post(url).params(params).json(data) {
            Ok(request) => self.request(request),
            Err(err) => CancelableResponse::failed(err),
        }
    }

    pub fn put<T>(
        &self,
        url: impl Into<String>,
        params: Params,
        data: &impl Serialize,
    ) -> CancelableResponse<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match Request::put(url).params(params).json(data) {
            Ok(request) => self.request(request),
            Err(err) => CancelableResponse::failed(err),
        }
    }

    pub fn delete<T>(&self, url: impl Into<String>, params: Params) -> CancelableResponse<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(Request::delete(url).params(params))
    }

    /// The server version reported by `/system/info`.
    pub async fn version(&self) -> Result<String> {
        let info: SystemInfo = self.get("/system/info", Params::new()).data().await?;
        Ok(info.version)
    }

    /// Metadata import/export endpoints.
    pub fn metadata(&self) -> Metadata<'_> {
        Metadata::new(self)
    }

    /// A single named model collection, e.g. `dataElements`.
    pub fn model(&self, name: impl Into<String>) -> Model<'_> {
        Model::new(self, name)
    }

    /// The global key-value store under `namespace`.
    pub fn data_store(&self, namespace: impl Into<String>) -> DataStore<'_> {
        DataStore::new(self, DataStoreScope::Global, namespace)
    }

    /// The per-user key-value store under `namespace`.
    pub fn user_data_store(&self, namespace: impl Into<String>) -> DataStore<'_> {
        DataStore::new(self, DataStoreScope::User, namespace)
    }

    /// Tracker (tracked entities, enrollments, events) endpoints.
    pub fn tracker(&self) -> Tracker<'_> {
        Tracker::new(self)
    }
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("base_url", &self.base_url)
            .field("api_path", &self.api_path)
            .finish()
    }
}

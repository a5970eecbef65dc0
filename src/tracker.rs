// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The tracker endpoint family.
//!
//! Tracker queries compile their field selection with the strict compiler
//! (only the `:all` preset is supported there) and normalize the response
//! envelope through [normalize_paged], since these endpoints have changed
//! both their result key and their paging shape across server versions.
//! Imports go through `POST /tracker`, synchronously or as a queued job.

use crate::api::Api;
use crate::client::{Params, Request};
use crate::error::Result;
use crate::fields::Fields;
use crate::paging::{normalize_paged, PagedResult};
use crate::response::CancelableResponse;
use crate::types::{AsyncJobInfo, ResponseEnvelope, Stats};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A query against one tracker collection.
#[derive(Clone, Debug, Default)]
pub struct TrackerQuery {
    pub fields: Fields,
    pub org_unit: Option<String>,
    pub program: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Ask the server to count (`totalPages=true`); without it the pager
    /// carries no totals.
    pub total_pages: bool,
    /// Endpoint-specific parameters passed through as-is.
    pub params: Params,
}

impl TrackerQuery {
    pub fn with_fields(fields: Fields) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    fn to_params(&self) -> Result<Params> {
        let mut params = Params::new().with("fields", self.fields.compile_strict()?);
        if let Some(org_unit) = &self.org_unit {
            params.push("orgUnit", org_unit.as_str());
        }
        if let Some(program) = &self.program {
            params.push("program", program.as_str());
        }
        if let Some(page) = self.page {
            params.push("page", page);
        }
        if let Some(page_size) = self.page_size {
            params.push("pageSize", page_size);
        }
        if self.total_pages {
            params.push("totalPages", true);
        }
        params.extend(self.params.clone());
        Ok(params)
    }
}

/// One collection under `/tracker`, identified by its path segment and the
/// resource key older servers use in the response envelope.
#[derive(Clone, Debug)]
pub struct TrackerCollection<'a> {
    api: &'a Api,
    path: &'static str,
    resource_key: &'static str,
}

impl<'a> TrackerCollection<'a> {
    /// Query the collection into the normalized paged contract.
    ///
    /// Fails synchronously on an unsupported field preset, before any
    /// request is issued.
    pub fn get<T>(&self, query: &TrackerQuery) -> Result<CancelableResponse<PagedResult<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let params = query.to_params()?;
        let resource_key = self.resource_key;
        Ok(self
            .api
            .send(Request::get(self.path).params(params))
            .try_map(move |response| normalize_paged(response.data.into_json()?, resource_key)))
    }
}

/// Options for `POST /tracker`.
#[derive(Clone, Debug, Default)]
pub struct TrackerPostParams {
    pub report_mode: Option<ReportMode>,
    pub import_strategy: Option<ImportStrategy>,
    pub atomic_mode: Option<AtomicMode>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReportMode {
    Full,
    Errors,
    Warnings,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImportStrategy {
    Create,
    Update,
    CreateAndUpdate,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AtomicMode {
    All,
    Object,
}

impl TrackerPostParams {
    fn to_params(&self, run_async: bool) -> Params {
        let mut params = Params::new();
        if let Some(mode) = self.report_mode {
            params.push(
                "reportMode",
                match mode {
                    ReportMode::Full => "FULL",
                    ReportMode::Errors => "ERRORS",
                    ReportMode::Warnings => "WARNINGS",
                },
            );
        }
        if let Some(strategy) = self.import_strategy {
            params.push(
                "importStrategy",
                match strategy {
                    ImportStrategy::Create => "CREATE",
                    ImportStrategy::Update => "UPDATE",
                    ImportStrategy::CreateAndUpdate => "CREATE_AND_UPDATE",
                    ImportStrategy::Delete => "DELETE",
                },
            );
        }
        if let Some(mode) = self.atomic_mode {
            params.push(
                "atomicMode",
                match mode {
                    AtomicMode::All => "ALL",
                    AtomicMode::Object => "OBJECT",
                },
            );
        }
        params.push("async", run_async);
        params
    }
}

/// One validation failure inside a tracker import report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerErrorReport {
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub tracker_type: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerValidationReport {
    #[serde(default)]
    pub error_reports: Vec<TrackerErrorReport>,
    #[serde(default)]
    pub warning_reports: Vec<TrackerErrorReport>,
}

/// Report of one imported object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerObjectReport {
    pub tracker_type: String,
    pub uid: String,
    pub index: u32,
    #[serde(default)]
    pub error_reports: Vec<TrackerErrorReport>,
}

/// Report of one object kind, keyed by that kind in the bundle report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerTypeReport {
    pub tracker_type: String,
    pub stats: Stats,
    #[serde(default)]
    pub object_reports: Vec<TrackerObjectReport>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerBundleReport {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub stats: Option<Stats>,
    /// Nested reports keyed by object kind (`TRACKED_ENTITY`, `EVENT`, ...).
    #[serde(default)]
    pub type_report_map: HashMap<String, TrackerTypeReport>,
}

/// The tracker import report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerPostResponse {
    pub status: String,
    pub stats: Stats,
    #[serde(default)]
    pub validation_report: TrackerValidationReport,
    #[serde(default)]
    pub bundle_report: Option<TrackerBundleReport>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Handle over the `/tracker` endpoint family.
#[derive(Clone, Debug)]
pub struct Tracker<'a> {
    api: &'a Api,
}

impl<'a> Tracker<'a> {
    pub(crate) fn new(api: &'a Api) -> Self {
        Self { api }
    }

    pub fn tracked_entities(&self) -> TrackerCollection<'a> {
        TrackerCollection {
            api: self.api,
            path: "/tracker/trackedEntities",
            resource_key: "trackedEntities",
        }
    }

    pub fn enrollments(&self) -> TrackerCollection<'a> {
        TrackerCollection {
            api: self.api,
            path: "/tracker/enrollments",
            resource_key: "enrollments",
        }
    }

    pub fn events(&self) -> TrackerCollection<'a> {
        TrackerCollection {
            api: self.api,
            path: "/tracker/events",
            resource_key: "events",
        }
    }

    /// Import a tracker bundle synchronously and resolve to the wrapped
    /// import report.
    pub fn post(
        &self,
        params: &TrackerPostParams,
        bundle: &impl Serialize,
    ) -> CancelableResponse<ResponseEnvelope<TrackerPostResponse>> {
        self.api
            .post("/tracker", params.to_params(false), bundle)
    }

    /// Queue a tracker import job and resolve to its handle.
    pub fn post_async(
        &self,
        params: &TrackerPostParams,
        bundle: &impl Serialize,
    ) -> CancelableResponse<ResponseEnvelope<AsyncJobInfo>> {
        self.api.post("/tracker", params.to_params(true), bundle)
    }
}

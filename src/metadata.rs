// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The bulk metadata endpoints.
//!
//! `GET /metadata` takes one field/filter selection per model, namespaced as
//! `<model>:fields` / `<model>:filter` query parameters. `POST /metadata`
//! returns an import report; newer servers wrap it in the standard response
//! envelope, which decoding tolerates transparently.

use crate::api::Api;
use crate::client::Params;
use crate::fields::Fields;
use crate::filter::{fields_filter_params, Filters};
use crate::response::CancelableResponse;
use crate::types::{ErrorReport, MaybeWrapped, Stats};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The field/filter selection for one model in a metadata export.
#[derive(Clone, Debug)]
pub struct MetadataSelection {
    pub model: String,
    pub fields: Fields,
    pub filters: Option<Filters>,
}

impl MetadataSelection {
    pub fn new(model: impl Into<String>, fields: Fields) -> Self {
        Self {
            model: model.into(),
            fields,
            filters: None,
        }
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Options for `POST /metadata`. Every field is optional; the server
/// defaults apply to whatever is left unset.
#[derive(Clone, Debug, Default)]
pub struct MetadataImportParams {
    pub import_mode: Option<ImportMode>,
    pub identifier: Option<Identifier>,
    pub import_strategy: Option<ImportStrategy>,
    pub atomic_mode: Option<AtomicMode>,
    pub merge_mode: Option<MergeMode>,
    pub skip_sharing: Option<bool>,
    pub skip_validation: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImportMode {
    Commit,
    Validate,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Identifier {
    Uid,
    Code,
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImportStrategy {
    CreateAndUpdate,
    Create,
    Update,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AtomicMode {
    All,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MergeMode {
    Merge,
    Replace,
}

impl MetadataImportParams {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(mode) = self.import_mode {
            params.push(
                "importMode",
                match mode {
                    ImportMode::Commit => "COMMIT",
                    ImportMode::Validate => "VALIDATE",
                },
            );
        }
        if let Some(identifier) = self.identifier {
            params.push(
                "identifier",
                match identifier {
                    Identifier::Uid => "UID",
                    Identifier::Code => "CODE",
                    Identifier::Auto => "AUTO",
                },
            );
        }
        if let Some(strategy) = self.import_strategy {
            params.push(
                "importStrategy",
                match strategy {
                    ImportStrategy::CreateAndUpdate => "CREATE_AND_UPDATE",
                    ImportStrategy::Create => "CREATE",
                    ImportStrategy::Update => "UPDATE",
                    ImportStrategy::Delete => "DELETE",
                },
            );
        }
        if let Some(mode) = self.atomic_mode {
            params.push(
                "atomicMode",
                match mode {
                    AtomicMode::All => "ALL",
                    AtomicMode::None => "NONE",
                },
            );
        }
        if let Some(mode) = self.merge_mode {
            params.push(
                "mergeMode",
                match mode {
                    MergeMode::Merge => "MERGE",
                    MergeMode::Replace => "REPLACE",
                },
            );
        }
        if let Some(skip) = self.skip_sharing {
            params.push("skipSharing", skip);
        }
        if let Some(skip) = self.skip_validation {
            params.push("skipValidation", skip);
        }
        params
    }
}

/// Report of one object in a metadata import.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReport {
    pub klass: String,
    pub index: u32,
    pub uid: String,
    #[serde(default)]
    pub error_reports: Vec<ErrorReport>,
}

/// Report of one object type in a metadata import.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeReport {
    pub klass: String,
    pub stats: Stats,
    #[serde(default)]
    pub object_reports: Vec<ObjectReport>,
}

/// The metadata import report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub status: String,
    pub stats: Stats,
    #[serde(default)]
    pub type_reports: Vec<TypeReport>,
}

/// Handle over the `/metadata` endpoints.
#[derive(Clone, Debug)]
pub struct Metadata<'a> {
    api: &'a Api,
}

impl<'a> Metadata<'a> {
    pub(crate) fn new(api: &'a Api) -> Self {
        Self { api }
    }

    /// Export metadata for several models at once. The response holds one
    /// array per requested model, so the caller picks the payload type.
    pub fn get<T>(&self, selections: &[MetadataSelection]) -> CancelableResponse<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut params = Params::new();
        for selection in selections {
            params.extend(fields_filter_params(
                Some(&selection.model),
                Some(&selection.fields),
                selection.filters.as_ref(),
            ));
        }
        self.api.get("/metadata", params)
    }

    /// Import a metadata payload and resolve to the import report.
    pub fn post(
        &self,
        payload: &impl Serialize,
        options: &MetadataImportParams,
    ) -> CancelableResponse<MetadataResponse> {
        self.api
            .post::<MaybeWrapped<MetadataResponse>>("/metadata", options.to_params(), payload)
            .map(|response| response.data.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_params_serialize_to_server_tokens() {
        let options = MetadataImportParams {
            import_mode: Some(ImportMode::Validate),
            import_strategy: Some(ImportStrategy::CreateAndUpdate),
            skip_sharing: Some(true),
            ..Default::default()
        };
        let params = options.to_params();
        let entries: Vec<_> = params.iter().cloned().collect();
        assert_eq!(entries[0].0, "importMode");
        assert_eq!(entries[1].0, "importStrategy");
        assert_eq!(entries[2].0, "skipSharing");
    }

    #[test]
    fn import_report_decodes() {
        let report: MetadataResponse = serde_json::from_value(json!({
            "status": "OK",
            "stats": {"created": 1, "updated": 0, "deleted": 0, "ignored": 0, "total": 1},
            "typeReports": [{
                "klass": "org.hisp.dhis.dataelement.DataElement",
                "stats": {"created": 1, "updated": 0, "deleted": 0, "ignored": 0, "total": 1},
                "objectReports": [{"klass": "org.hisp.dhis.dataelement.DataElement", "index": 0, "uid": "abc123", "errorReports": []}],
            }],
        }))
        .unwrap();
        assert_eq!(report.stats.created, 1);
        assert_eq!(report.type_reports[0].object_reports[0].uid, "abc123");
    }
}

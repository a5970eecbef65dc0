// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Legacy model-collection queries.
//!
//! Metadata collections (`/dataElements`, `/organisationUnits`, ...) answer
//! with the older envelope: the objects sit under the collection's own
//! plural name next to a `pager` object. [Model::get] decodes that envelope
//! into objects plus an optional pager, keeping the pager only for paged
//! queries.

use crate::api::Api;
use crate::client::{Params, Request};
use crate::error::{DecodeSnafu, Result};
use crate::fields::Fields;
use crate::filter::{fields_filter_params, Filters};
use crate::paging::Pager;
use crate::response::CancelableResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::ResultExt;

/// Combinator for the boolean `rootJunction` filter parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RootJunction {
    And,
    Or,
}

/// Options for one collection query.
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    pub fields: Fields,
    pub filters: Option<Filters>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// `false` disables the pager entirely (`paging=false`).
    pub paging: Option<bool>,
    pub order: Option<String>,
    pub root_junction: Option<RootJunction>,
}

impl GetOptions {
    fn to_params(&self) -> Params {
        let mut params = fields_filter_params(None, Some(&self.fields), self.filters.as_ref());
        if let Some(page) = self.page {
            params.push("page", page);
        }
        if let Some(page_size) = self.page_size {
            params.push("pageSize", page_size);
        }
        if let Some(paging) = self.paging {
            params.push("paging", paging);
        }
        if let Some(order) = &self.order {
            params.push("order", order.as_str());
        }
        if let Some(junction) = self.root_junction {
            params.push(
                "rootJunction",
                match junction {
                    RootJunction::And => "AND",
                    RootJunction::Or => "OR",
                },
            );
        }
        params
    }
}

/// A page (or the entirety) of one model collection.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionObjects<T> {
    pub objects: Vec<T>,
    /// Absent for `paging=false` queries.
    pub pager: Option<Pager>,
}

/// Handle over one named model collection.
#[derive(Clone, Debug)]
pub struct Model<'a> {
    api: &'a Api,
    name: String,
}

impl<'a> Model<'a> {
    pub(crate) fn new(api: &'a Api, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query the collection, decoding the legacy `{pager, <plural>: [...]}`
    /// envelope.
    pub fn get<T>(&self, options: &GetOptions) -> CancelableResponse<CollectionObjects<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let name = self.name.clone();
        let paged = options.paging.unwrap_or(true);
        let request = Request::get(format!("/{}", name)).params(options.to_params());
        self.api
            .send(request)
            .try_map(move |response| decode_collection(response.data.into_json()?, &name, paged))
    }
}

fn decode_collection<T: DeserializeOwned>(
    mut envelope: Value,
    name: &str,
    paged: bool,
) -> Result<CollectionObjects<T>> {
    let pager = match envelope.as_object_mut().and_then(|map| map.remove("pager")) {
        Some(pager) if paged => serde_json::from_value(pager).map(Some).context(DecodeSnafu)?,
        _ => None,
    };
    let objects = envelope
        .as_object_mut()
        .and_then(|map| map.remove(name))
        .unwrap_or(Value::Array(Vec::new()));
    let objects: Vec<T> = serde_json::from_value(objects).context(DecodeSnafu)?;
    Ok(CollectionObjects { objects, pager })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_envelope_decodes_objects_and_pager() {
        let envelope = json!({
            "pager": {"page": 1, "pageSize": 50, "pageCount": 1, "total": 2},
            "dataElements": [{"id": "a"}, {"id": "b"}],
        });
        let collection: CollectionObjects<Value> =
            decode_collection(envelope, "dataElements", true).unwrap();
        assert_eq!(collection.objects.len(), 2);
        assert_eq!(collection.pager.unwrap().total, Some(2));
    }

    #[test]
    fn unpaged_queries_drop_the_pager() {
        let envelope = json!({
            "dataElements": [{"id": "a"}],
        });
        let collection: CollectionObjects<Value> =
            decode_collection(envelope, "dataElements", false).unwrap();
        assert_eq!(collection.objects.len(), 1);
        assert!(collection.pager.is_none());
    }

    #[test]
    fn missing_collection_key_is_an_empty_collection() {
        let collection: CollectionObjects<Value> =
            decode_collection(json!({}), "indicators", true).unwrap();
        assert!(collection.objects.is_empty());
        assert!(collection.pager.is_none());
    }
}

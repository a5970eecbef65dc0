// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Normalization of paginated collection envelopes.
//!
//! Tracker-style endpoints have returned their results under a
//! resource-specific plural key (`trackedEntities`, `events`, ...) in older
//! server versions and under a generic `instances` key in newer ones, with
//! paging exposed either as a nested `pager` object or as flat fields on the
//! envelope. [normalize_paged] reconciles all four combinations into one
//! [PagedResult] contract, deterministically and without side effects.

use crate::error::{DecodeSnafu, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::ResultExt;

/// Paging metadata accompanying a collection result.
///
/// `page_count` and `total` are present only when the request explicitly
/// asked the server to count (`totalPages=true`); their absence means
/// "not counted", never zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pager {
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// The normalized paged-collection contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub instances: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pager: Option<Pager>,
}

/// Reconcile a raw tracker-style envelope into a [PagedResult].
///
/// Precedence: the generic `instances` key wins whenever it is present
/// (even empty), falling back to the array under `resource_key`, then to an
/// empty collection. The pager is the nested `pager` object when present,
/// else synthesized from the flat `page`/`pageSize`/`pageCount`/`total`
/// fields, else absent (for unpaged queries).
pub fn normalize_paged<T: serde::de::DeserializeOwned>(
    mut envelope: Value,
    resource_key: &str,
) -> Result<PagedResult<T>> {
    let pager = extract_pager(&mut envelope)?;

    let instances = match take_field(&mut envelope, "instances") {
        Some(instances) => instances,
        None => take_field(&mut envelope, resource_key).unwrap_or(Value::Array(Vec::new())),
    };
    let instances: Vec<T> = serde_json::from_value(instances).context(DecodeSnafu)?;

    Ok(PagedResult { instances, pager })
}

fn extract_pager(envelope: &mut Value) -> Result<Option<Pager>> {
    if let Some(nested) = take_field(envelope, "pager") {
        return serde_json::from_value(nested).map(Some).context(DecodeSnafu);
    }

    let page = take_number(envelope, "page");
    let page_size = take_number(envelope, "pageSize");
    match (page, page_size) {
        (Some(page), Some(page_size)) => Ok(Some(Pager {
            page,
            page_size,
            page_count: take_number(envelope, "pageCount"),
            total: take_number(envelope, "total"),
        })),
        _ => Ok(None),
    }
}

fn take_field(envelope: &mut Value, key: &str) -> Option<Value> {
    match envelope {
        Value::Object(map) => map.remove(key),
        _ => None,
    }
}

fn take_number(envelope: &mut Value, key: &str) -> Option<u32> {
    take_field(envelope, key)
        .and_then(|value| value.as_u64())
        .map(|value| value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_paging_fields_synthesize_a_pager() {
        let envelope = json!({
            "trackedEntities": [{"id": "x"}, {"id": "y"}],
            "page": 1,
            "pageSize": 50,
        });
        let result: PagedResult<Value> = normalize_paged(envelope, "trackedEntities").unwrap();
        assert_eq!(result.instances.len(), 2);
        assert_eq!(
            result.pager,
            Some(Pager {
                page: 1,
                page_size: 50,
                page_count: None,
                total: None,
            })
        );
    }

    #[test]
    fn generic_instances_key_wins_over_resource_key() {
        let envelope = json!({
            "instances": [{"id": "x"}],
            "trackedEntities": [{"id": "y"}, {"id": "z"}],
        });
        let result: PagedResult<Value> = normalize_paged(envelope, "trackedEntities").unwrap();
        assert_eq!(result.instances, vec![json!({"id": "x"})]);
    }

    #[test]
    fn empty_instances_key_still_wins() {
        let envelope = json!({
            "instances": [],
            "events": [{"id": "y"}],
        });
        let result: PagedResult<Value> = normalize_paged(envelope, "events").unwrap();
        assert!(result.instances.is_empty());
    }

    #[test]
    fn resource_key_is_not_dropped_when_instances_is_absent() {
        let envelope = json!({"events": [{"id": "a"}, {"id": "b"}]});
        let result: PagedResult<Value> = normalize_paged(envelope, "events").unwrap();
        assert_eq!(result.instances.len(), 2);
    }

    #[test]
    fn nested_pager_takes_precedence_over_flat_fields() {
        let envelope = json!({
            "instances": [],
            "pager": {"page": 3, "pageSize": 10, "total": 31, "pageCount": 4},
            "page": 999,
        });
        let result: PagedResult<Value> = normalize_paged(envelope, "events").unwrap();
        assert_eq!(
            result.pager,
            Some(Pager {
                page: 3,
                page_size: 10,
                page_count: Some(4),
                total: Some(31),
            })
        );
    }

    #[test]
    fn missing_counts_stay_absent_rather_than_zero() {
        let envelope = json!({
            "instances": [],
            "pager": {"page": 1, "pageSize": 50},
        });
        let result: PagedResult<Value> = normalize_paged(envelope, "events").unwrap();
        let pager = result.pager.unwrap();
        assert_eq!(pager.total, None);
        assert_eq!(pager.page_count, None);
    }

    #[test]
    fn no_keys_at_all_yields_an_empty_unpaged_result() {
        let result: PagedResult<Value> = normalize_paged(json!({}), "events").unwrap();
        assert!(result.instances.is_empty());
        assert!(result.pager.is_none());
    }

    #[test]
    fn typed_instances_decode() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Entity {
            id: String,
        }
        let envelope = json!({"instances": [{"id": "u1"}]});
        let result: PagedResult<Entity> = normalize_paged(envelope, "trackedEntities").unwrap();
        assert_eq!(
            result.instances,
            vec![Entity {
                id: "u1".to_string()
            }]
        );
    }
}

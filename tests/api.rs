// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! End-to-end exercises of the API surface over the mock transport.

use dhis2_net::fields::Fields;
use dhis2_net::filter::{Filter, Filters};
use dhis2_net::metadata::{MetadataImportParams, MetadataSelection};
use dhis2_net::mock::MockClient;
use dhis2_net::model::GetOptions;
use dhis2_net::tracker::{TrackerPostParams, TrackerQuery};
use dhis2_net::{Api, Error, Request, ResponseType};
use serde_json::{json, Value};
use std::sync::Arc;

fn api_over(mock: &MockClient) -> Api {
    Api::with_client(Arc::new(mock.clone()))
}

#[async_std::test]
async fn typed_requests_decode_json_bodies() {
    let mock = MockClient::new();
    mock.stub_json(200, json!({"id": "u1", "name": "ANC visit"}));
    let api = api_over(&mock);

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct DataElement {
        id: String,
        name: String,
    }

    let element: DataElement = api
        .get("/dataElements/u1", Default::default())
        .data()
        .await
        .unwrap();
    assert_eq!(element.id, "u1");
    assert_eq!(element.name, "ANC visit");
    assert_eq!(mock.hits(), 1);
}

#[async_std::test]
async fn rejected_statuses_surface_the_uniform_error() {
    let mock = MockClient::new();
    mock.stub_json(409, json!({"httpStatus": "Conflict", "message": "already exists"}));
    let api = api_over(&mock);

    let err = api
        .get::<Value>("/dataElements", Default::default())
        .data()
        .await
        .unwrap_err();
    match err {
        Error::Http { status, body, .. } => {
            assert_eq!(status, 409);
            assert!(body.is_some());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[async_std::test]
async fn version_reads_system_info() {
    let mock = MockClient::new();
    mock.stub_json(200, json!({"version": "2.39.1", "revision": "abc"}));
    let api = api_over(&mock);
    assert_eq!(api.version().await.unwrap(), "2.39.1");
    assert_eq!(mock.requests()[0].url, "/system/info");
}

#[async_std::test]
async fn cancelling_before_consumption_prevents_the_exchange() {
    let mock = MockClient::new();
    mock.stub_json(200, json!({}));
    let api = api_over(&mock);

    let response = api.get::<Value>("/dataElements", Default::default());
    let cancel = response.canceler();
    cancel();
    assert!(response.data().await.unwrap_err().is_cancelled());
    assert_eq!(mock.hits(), 0);
}

#[async_std::test]
async fn raw_responses_pass_bytes_through() {
    let mock = MockClient::new();
    mock.stub(dhis2_net::mock::Stub {
        status: 200,
        payload: dhis2_net::Payload::Bytes(vec![1, 2, 3]),
        headers: Default::default(),
    });
    let api = api_over(&mock);

    let bytes = api
        .send(Request::get("/files/x/data").response_type(ResponseType::Raw))
        .bytes()
        .data()
        .await
        .unwrap();
    assert_eq!(bytes, vec![1, 2, 3]);
}

#[async_std::test]
async fn data_store_maps_missing_namespaces_to_empty() {
    let mock = MockClient::new();
    mock.stub_json(404, json!({"httpStatus": "NotFound"}));
    let api = api_over(&mock);

    let keys = api.data_store("my-app").keys().data().await.unwrap();
    assert!(keys.is_empty());
    assert_eq!(mock.requests()[0].url, "/dataStore/my-app");
}

#[async_std::test]
async fn data_store_distinguishes_absent_from_error() {
    let mock = MockClient::new();
    mock.stub_json(404, json!({"httpStatus": "NotFound"}));
    mock.stub_json(500, json!({"httpStatus": "InternalServerError"}));
    let api = api_over(&mock);
    let store = api.data_store("my-app");

    let absent: Option<Value> = store.get("missing").data().await.unwrap();
    assert!(absent.is_none());

    let err = store.get::<Value>("broken").data().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[async_std::test]
async fn data_store_save_falls_back_to_post_on_missing_key() {
    let mock = MockClient::new();
    mock.stub_json(404, json!({"httpStatus": "NotFound"}));
    mock.stub_json(201, json!({"httpStatus": "Created"}));
    let api = api_over(&mock);

    api.data_store("my-app")
        .save("settings", &json!({"locale": "en"}))
        .data()
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].url, "/dataStore/my-app/settings");
    assert_eq!(requests[1].body, Some(json!({"locale": "en"})));
}

#[async_std::test]
async fn data_store_save_skips_post_when_put_succeeds() {
    let mock = MockClient::new();
    mock.stub_json(200, json!({"httpStatus": "OK"}));
    let api = api_over(&mock);

    api.user_data_store("my-app")
        .save("settings", &json!({"locale": "fr"}))
        .data()
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "/userDataStore/my-app/settings");
}

#[async_std::test]
async fn data_store_delete_reports_existence() {
    let mock = MockClient::new();
    mock.stub_json(200, json!({}));
    mock.stub_json(404, json!({}));
    let api = api_over(&mock);
    let store = api.data_store("my-app");

    assert!(store.delete("present").data().await.unwrap());
    assert!(!store.delete("gone").data().await.unwrap());
}

#[async_std::test]
async fn model_queries_send_compiled_fields_and_filters() {
    let mock = MockClient::new();
    mock.stub_json(
        200,
        json!({
            "pager": {"page": 1, "pageSize": 50, "pageCount": 1, "total": 1},
            "dataElements": [{"id": "u1"}],
        }),
    );
    let api = api_over(&mock);

    let options = GetOptions {
        fields: Fields::new().field("id").field("name"),
        filters: Some(Filters::new().with("name", Filter::like("ANC"))),
        page: Some(1),
        ..Default::default()
    };
    let collection = api
        .model("dataElements")
        .get::<Value>(&options)
        .data()
        .await
        .unwrap();
    assert_eq!(collection.objects.len(), 1);
    assert_eq!(collection.pager.unwrap().total, Some(1));

    let request = &mock.requests()[0];
    assert_eq!(request.url, "/dataElements");
    assert!(request
        .params
        .iter()
        .any(|(key, values)| key == "fields" && values == &vec!["id,name".to_string()]));
    assert!(request
        .params
        .iter()
        .any(|(key, values)| key == "filter" && values == &vec!["name:like:ANC".to_string()]));
}

#[async_std::test]
async fn metadata_get_namespaces_params_per_model() {
    let mock = MockClient::new();
    mock.stub_json(200, json!({"dataElements": [], "indicators": []}));
    let api = api_over(&mock);

    let selections = vec![
        MetadataSelection::new("dataElements", Fields::new().field("id")),
        MetadataSelection::new("indicators", Fields::all())
            .filters(Filters::new().with("name", Filter::eq("x"))),
    ];
    let _: Value = api.metadata().get(&selections).data().await.unwrap();

    let request = &mock.requests()[0];
    assert_eq!(request.url, "/metadata");
    let keys: Vec<_> = request.params.iter().map(|(key, _)| key.clone()).collect();
    assert!(keys.contains(&"dataElements:fields".to_string()));
    assert!(keys.contains(&"indicators:fields".to_string()));
    assert!(keys.contains(&"indicators:filter".to_string()));
}

#[async_std::test]
async fn metadata_post_unwraps_the_wrapped_envelope() {
    let mock = MockClient::new();
    mock.stub_json(
        200,
        json!({
            "httpStatus": "OK",
            "httpStatusCode": 200,
            "status": "OK",
            "response": {
                "status": "OK",
                "stats": {"created": 1, "updated": 0, "deleted": 0, "ignored": 0, "total": 1},
                "typeReports": [],
            },
        }),
    );
    let api = api_over(&mock);

    let report = api
        .metadata()
        .post(
            &json!({"dataElements": [{"name": "ANC"}]}),
            &MetadataImportParams::default(),
        )
        .data()
        .await
        .unwrap();
    assert_eq!(report.stats.created, 1);
}

#[async_std::test]
async fn tracker_queries_normalize_legacy_envelopes() {
    let mock = MockClient::new();
    mock.stub_json(
        200,
        json!({
            "trackedEntities": [{"trackedEntity": "a"}, {"trackedEntity": "b"}],
            "page": 1,
            "pageSize": 50,
        }),
    );
    let api = api_over(&mock);

    let mut query = TrackerQuery::with_fields(Fields::all());
    query.org_unit = Some("O6uvpzGd5pu".to_string());
    let result = api
        .tracker()
        .tracked_entities()
        .get::<Value>(&query)
        .unwrap()
        .data()
        .await
        .unwrap();

    assert_eq!(result.instances.len(), 2);
    let pager = result.pager.unwrap();
    assert_eq!(pager.page, 1);
    assert_eq!(pager.total, None);

    let request = &mock.requests()[0];
    assert!(request
        .params
        .iter()
        .any(|(key, values)| key == "fields" && values == &vec![":all".to_string()]));
}

#[async_std::test]
async fn tracker_queries_prefer_the_instances_key() {
    let mock = MockClient::new();
    mock.stub_json(
        200,
        json!({
            "instances": [{"event": "e1"}],
            "events": [{"event": "stale"}],
            "pager": {"page": 2, "pageSize": 10},
        }),
    );
    let api = api_over(&mock);

    let result = api
        .tracker()
        .events()
        .get::<Value>(&TrackerQuery::with_fields(Fields::all()))
        .unwrap()
        .data()
        .await
        .unwrap();
    assert_eq!(result.instances, vec![json!({"event": "e1"})]);
    assert_eq!(result.pager.unwrap().page, 2);
}

#[async_std::test]
async fn tracker_rejects_partial_presets_without_issuing_requests() {
    let mock = MockClient::new();
    let api = api_over(&mock);

    let err = api
        .tracker()
        .enrollments()
        .get::<Value>(&TrackerQuery::with_fields(Fields::new().field("$owner")))
        .unwrap_err();
    match err {
        Error::InvalidSelectors { keys } => assert_eq!(keys, vec!["$owner"]),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(mock.hits(), 0);
}

#[async_std::test]
async fn tracker_post_resolves_to_the_import_report() {
    let mock = MockClient::new();
    mock.stub_json(
        200,
        json!({
            "httpStatus": "OK",
            "httpStatusCode": 200,
            "status": "OK",
            "response": {
                "status": "OK",
                "stats": {"created": 1, "updated": 0, "deleted": 0, "ignored": 0, "total": 1},
                "validationReport": {"errorReports": [], "warningReports": []},
            },
        }),
    );
    let api = api_over(&mock);

    let envelope = api
        .tracker()
        .post(
            &TrackerPostParams::default(),
            &json!({"trackedEntities": []}),
        )
        .data()
        .await
        .unwrap();
    assert_eq!(envelope.response.stats.created, 1);

    let request = &mock.requests()[0];
    assert!(request
        .params
        .iter()
        .any(|(key, values)| key == "async" && values == &vec!["false".to_string()]));
}

//! ApiClient behaviour against a mock backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use upkeep_config::UpkeepConfig;
use upkeep_fields::Record;
use upkeep_transport::{
    ok_envelope, ApiClient, ApiError, Backend, CredentialStore, ListQuery, ListShape,
    MemoryCredentialStore, NoticeLevel, RecordingNavigator, RecordingNotifier, TenantContext,
    UploadFile,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    client: ApiClient,
    store: Arc<MemoryCredentialStore>,
    notifier: Arc<RecordingNotifier>,
    navigator: Arc<RecordingNavigator>,
}

fn harness(server: &MockServer, current_path: &str) -> Harness {
    let store = Arc::new(MemoryCredentialStore::with_token("tok-1"));
    let notifier = Arc::new(RecordingNotifier::new());
    let navigator = Arc::new(RecordingNavigator::new(current_path));
    let client = ApiClient::builder(&UpkeepConfig::default(), TenantContext::tenant("acme"))
        .base_url(server.uri())
        .credentials(store.clone())
        .notifier(notifier.clone())
        .navigator(navigator.clone())
        .build()
        .unwrap();
    Harness {
        client,
        store,
        notifier,
        navigator,
    }
}

#[tokio::test]
async fn bearer_token_read_at_call_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/equipments/1"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(json!({"id": 1}))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assets/equipments/1"))
        .and(header("authorization", "Bearer tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(json!({"id": 1, "v": 2}))))
        .mount(&server)
        .await;

    let h = harness(&server, "/assets");
    let first = h.client.fetch_one("/assets/equipments/1").await.unwrap();
    assert!(!first.contains_key("v"));

    h.store
        .save(&upkeep_transport::StoredCredentials::new("tok-2"))
        .unwrap();
    let second = h.client.fetch_one("/assets/equipments/1").await.unwrap();
    assert_eq!(second["v"], json!(2));
}

#[tokio::test]
async fn unauthorized_clears_credentials_and_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/work_orders/work_orders"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, "/work-orders/open");
    let result = h
        .client
        .fetch_list("/work_orders/work_orders", &ListQuery::new())
        .await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(h.store.access_token(), None);
    assert_eq!(h.navigator.redirects(), vec!["/login?next=/work-orders/open"]);
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn unauthorized_on_page_sharing_login_prefix_still_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/login_history"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let h = harness(&server, "/login-history");
    let result = h.client.fetch_one("/users/login_history").await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(h.navigator.redirects(), vec!["/login?next=/login-history"]);

    let on_login = harness(&server, "/login?next=/parts");
    let result = on_login.client.fetch_one("/users/login_history").await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(on_login.navigator.redirects().is_empty());
}

#[tokio::test]
async fn get_retried_once_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parts/parts/7"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/parts/parts/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(json!({"id": 7, "name": "Belt"}))))
        .mount(&server)
        .await;

    let h = harness(&server, "/parts");
    let record = h.client.fetch_one("/parts/parts/7").await.unwrap();
    assert_eq!(record["name"], json!("Belt"));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn persistent_failure_escalates_after_one_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parts/parts/7"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let h = harness(&server, "/parts");
    let result = h.client.fetch_one("/parts/parts/7").await;
    assert!(matches!(result, Err(ApiError::Status { status: 503 })));

    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(
        notices[0].message,
        upkeep_transport::status_message(503).to_string()
    );
}

#[tokio::test]
async fn post_not_replayed_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parts/parts"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, "/parts/new");
    let result = h.client.create("/parts/parts", &Record::new()).await;
    assert!(matches!(result, Err(ApiError::Status { status: 500 })));
}

#[tokio::test]
async fn excess_requests_are_queued_not_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/equipments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(12)
        .mount(&server)
        .await;

    let h = harness(&server, "/assets");
    let query = ListQuery::new();
    let start = Instant::now();
    let results = futures::future::join_all(
        (0..12).map(|_| h.client.fetch_list("/assets/equipments", &query)),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn field_errors_surface_without_toast() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/assets/equipments/42"))
        .and(body_json(json!({"name": ""})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "data": null,
            "meta_data": {"success": false, "message": "Invalid asset"},
            "errors": {"name": ["This field may not be blank."]}
        })))
        .mount(&server)
        .await;

    let h = harness(&server, "/assets/edit/42");
    let mut payload = Record::new();
    payload.insert("name".into(), json!(""));
    let err = h
        .client
        .update("/assets/equipments/42", &payload)
        .await
        .unwrap_err();

    assert_eq!(
        err.field_errors().unwrap()["name"],
        vec!["This field may not be blank."]
    );
    assert_eq!(err.user_message(), "Invalid asset");
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn success_status_with_failed_envelope_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/purchases/purchase_orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "meta_data": {"success": false, "message": "Budget exceeded"}
        })))
        .mount(&server)
        .await;

    let h = harness(&server, "/purchase-orders/new");
    let err = h
        .client
        .create("/purchases/purchase_orders", &Record::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Server { ref message } if message == "Budget exceeded"));
}

#[tokio::test]
async fn single_record_without_envelope_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/companies/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .mount(&server)
        .await;

    let h = harness(&server, "/admin/companies/3");
    let err = h.client.fetch_one("/admin/companies/3").await.unwrap_err();
    assert!(matches!(err, ApiError::MalformedEnvelope { .. }));
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn list_shapes_normalize_identically() {
    let server = MockServer::start().await;
    let rows = json!([{"id": 1, "name": "Pump"}, {"id": 2, "name": "Valve"}]);
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(rows.clone())))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": rows.clone(),
            "pagination": {"page": 1, "pageSize": 10, "total": 2}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": rows.clone(), "count": 2, "next": null, "previous": null
        })))
        .mount(&server)
        .await;

    let h = harness(&server, "/");
    let query = ListQuery::new();
    let a = h.client.fetch_list("/a", &query).await.unwrap();
    let b = h.client.fetch_list("/b", &query).await.unwrap();
    let c = h.client.fetch_list("/c", &query).await.unwrap();

    assert_eq!(a.data, b.data);
    assert_eq!(b.data, c.data);
    assert_eq!(
        [a.shape, b.shape, c.shape],
        [ListShape::Array, ListShape::Paginated, ListShape::Cursor]
    );
}

#[tokio::test]
async fn list_query_parameters_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/equipments"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "25"))
        .and(query_param("search", "pump"))
        .and(query_param("ordering", "-name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [], "count": 30, "next": null, "previous": "x"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, "/assets");
    let query = ListQuery::new()
        .page(2)
        .page_size(25)
        .search("pump")
        .order_by("name", true);
    let result = h
        .client
        .fetch_list("/assets/equipments", &query)
        .await
        .unwrap();
    assert_eq!(result.pagination.total_items, 30);
    assert!(result.pagination.has_previous);
}

#[tokio::test]
async fn media_upload_is_multipart_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/media_uploader/upload"))
        .respond_with(ResponseTemplate::new(201).set_body_json(ok_envelope(json!({
            "id": 88,
            "file": "https://cdn.example.com/m/88/manual.pdf",
            "file_type": "application/pdf"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, "/assets/edit/42");
    let media = h
        .client
        .upload_media(UploadFile::new(
            "manual.pdf",
            "application/pdf",
            b"%PDF-1.4".to_vec(),
        ))
        .await
        .unwrap();
    assert_eq!(media.id, "88");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"manual.pdf\""));
    assert!(body.contains("%PDF-1.4"));
}

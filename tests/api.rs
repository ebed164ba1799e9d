use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use vegstock::dates::FixedClock;
use vegstock::db::init_db;
use vegstock::server::{router, AppState};

const TODAY: (i32, u32, u32) = (2024, 3, 15);

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_db(&dir.path().join("test.db")).await.unwrap();
        let (y, m, d) = TODAY;
        let today = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let state = AppState::new(pool).with_clock(FixedClock(today));
        Self {
            router: router(state),
            _dir: dir,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, Body::empty()).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, Body::empty()).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Body::from(body.to_string())).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Body::from(body.to_string())).await
    }

    async fn create_vegetable(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/vegetables",
                json!({"name": name, "price": 2.5, "category": "root", "photo": "veg.jpg"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

fn error_of(body: &Value) -> &str {
    body["error"].as_str().unwrap()
}

const UNKNOWN_ID: &str = "65a1b2c3d4e5f60718293a4b";

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["today"], "2024-03-15");
}

#[tokio::test]
async fn test_create_and_get_vegetable() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/vegetables",
            json!({"name": "  Carrot ", "price": "1.75", "category": "root", "photo": "c.jpg"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Vegetable created");
    let id = body["id"].as_str().unwrap();
    assert_eq!(id.len(), 24);

    let (status, veg) = app.get(&format!("/vegetables/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(veg["id"], id);
    assert_eq!(veg["name"], "Carrot");
    assert_eq!(veg["price"], 1.75);
    assert_eq!(veg["category"], "root");
    assert_eq!(veg["photo"], "c.jpg");
    assert!(veg["createdAt"].is_string());

    // Uppercase ids address the same vegetable
    let (status, _) = app
        .get(&format!("/vegetables/{}", id.to_uppercase()))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_vegetables_in_insertion_order() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/vegetables").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    app.create_vegetable("Onion").await;
    app.create_vegetable("Beet").await;

    let (_, body) = app.get("/vegetables").await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Onion", "Beet"]);
}

#[tokio::test]
async fn test_vegetable_validation_messages() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/vegetables", json!({"price": 1, "category": "root"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Name is required and cannot be empty");

    let (status, body) = app
        .post(
            "/vegetables",
            json!({"name": "Kale", "price": -1, "category": "leaves"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Price must be a valid non-negative number");

    let (status, body) = app
        .post("/vegetables", json!({"name": "Kale", "price": 1}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Category is required");

    let (status, body) = app
        .post(
            "/vegetables",
            json!({"name": "Kale", "price": 1, "category": "Leaves"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(&body),
        "Category must be one of: stem, root, bulb, leaves, fruits, herb, seeds, vegetable"
    );

    let (_, list) = app.get("/vegetables").await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_vegetable_id_errors() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/vegetables/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(&body),
        "Invalid ID format: Must be a 24-character hexadecimal string"
    );

    let (status, body) = app.get(&format!("/vegetables/{}", UNKNOWN_ID)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Vegetable not found");

    let (status, _) = app
        .put(
            &format!("/vegetables/{}", UNKNOWN_ID),
            json!({"name": "Leek", "price": 1, "category": "stem"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_and_delete_vegetable() {
    let app = TestApp::new().await;
    let id = app.create_vegetable("Garlic").await;
    let uri = format!("/vegetables/{}", id);

    let (status, body) = app
        .put(&uri, json!({"name": "Black garlic", "price": 9, "category": "bulb"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Vegetable updated");

    let (_, veg) = app.get(&uri).await;
    assert_eq!(veg["name"], "Black garlic");
    assert_eq!(veg["category"], "bulb");
    assert_eq!(veg["photo"], "veg.jpg");

    let (status, body) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Vegetable deleted");

    let (status, body) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Vegetable not found");
}

// ============================================================================
// Daily stock
// ============================================================================

#[tokio::test]
async fn test_merge_or_create_scenario() {
    let app = TestApp::new().await;
    let id = app.create_vegetable("Carrot").await;

    let (status, body) = app
        .post(
            "/daily-stock",
            json!({"date": "2024-01-01", "vegetables": [{"id": id, "quantity": 2, "photo": "a.jpg"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "2024-01-01");
    assert_eq!(body["message"], "Daily stock created");

    let (status, body) = app
        .post(
            "/daily-stock",
            json!({"date": "2024-01-01", "vegetables": [{"id": id, "quantity": 3, "photo": "b.jpg"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Vegetables merged or appended to daily stock");

    let (status, stock) = app.get("/daily-stock/2024-01-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock["date"], "2024-01-01");
    let entries = stock["vegetables"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], id.as_str());
    assert_eq!(entries[0]["quantity"], 5.0);
    assert_eq!(entries[0]["photo"], "b.jpg");
}

#[tokio::test]
async fn test_merge_appends_new_ids_in_order() {
    let app = TestApp::new().await;
    let a = app.create_vegetable("Radish").await;
    let b = app.create_vegetable("Turnip").await;

    app.post(
        "/daily-stock",
        json!({"date": "2024-01-01", "vegetables": [{"id": a, "quantity": 1, "photo": "a.jpg"}]}),
    )
    .await;
    app.post(
        "/daily-stock",
        json!({"date": "2024-01-01", "vegetables": [
            {"id": b, "quantity": 4, "photo": "b.jpg"},
            {"id": a, "quantity": 1.5, "photo": "a2.jpg"}
        ]}),
    )
    .await;

    let (_, stock) = app.get("/daily-stock/2024-01-01").await;
    assert_eq!(
        stock["vegetables"],
        json!([
            {"id": a, "quantity": 2.5, "photo": "a2.jpg"},
            {"id": b, "quantity": 4.0, "photo": "b.jpg"}
        ])
    );
}

#[tokio::test]
async fn test_overflowing_merge_is_rejected_and_record_stays_readable() {
    let app = TestApp::new().await;
    let id = app.create_vegetable("Pumpkin").await;
    let body = json!({"date": "2024-01-01", "vegetables": [{"id": id, "quantity": 1e308, "photo": "p.jpg"}]});

    let (status, _) = app.post("/daily-stock", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = app.post("/daily-stock", body.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(&err),
        format!("Quantity for vegetable {} is too large", id)
    );

    let (status, stock) = app.get("/daily-stock/2024-01-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock["vegetables"][0]["quantity"], 1e308);
    let (status, _) = app.get("/daily-stock").await;
    assert_eq!(status, StatusCode::OK);

    // The date still accepts ordinary merges
    let (status, _) = app
        .post(
            "/daily-stock",
            json!({"date": "2024-01-01", "vegetables": [{"id": id, "quantity": 1, "photo": "p.jpg"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Duplicates within one replace are summed too
    let doubled = json!({"vegetables": [
        {"id": id, "quantity": 1e308, "photo": "a.jpg"},
        {"id": id, "quantity": 1e308, "photo": "b.jpg"}
    ]});
    let (status, _) = app.put("/daily-stock/2024-01-02", doubled).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/daily-stock/2024-01-02").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_vegetable_message_echoes_id_as_sent() {
    let app = TestApp::new().await;
    let shouted = UNKNOWN_ID.to_uppercase();
    let (status, body) = app
        .post(
            "/daily-stock",
            json!({"vegetables": [{"id": shouted, "quantity": 1, "photo": "u.jpg"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(&body),
        format!("Vegetable with id {} not found", shouted)
    );
}

#[tokio::test]
async fn test_post_without_date_uses_today() {
    let app = TestApp::new().await;
    let id = app.create_vegetable("Chard").await;

    let (status, body) = app
        .post(
            "/daily-stock",
            json!({"vegetables": [{"id": id, "quantity": 1, "photo": "c.jpg"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "2024-03-15");
}

#[tokio::test]
async fn test_invalid_dates_rejected() {
    let app = TestApp::new().await;
    let id = app.create_vegetable("Pea").await;

    let (status, body) = app
        .post(
            "/daily-stock",
            json!({"date": "2023-02-30", "vegetables": [{"id": id, "quantity": 1, "photo": "p.jpg"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Invalid date format: Use YYYY-MM-DD");

    for uri in ["/daily-stock/2023-02-30", "/daily-stock/2024-1-01", "/daily-stock/today"] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(error_of(&body), "Invalid date format: Use YYYY-MM-DD");
    }

    // The alias is only understood by GET
    let (status, _) = app
        .put("/daily-stock/previous-day", json!({"vegetables": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.delete("/daily-stock/previous-day").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_previous_day_alias() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/daily-stock/previous-day").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Daily stock not found for previous day");

    let (status, body) = app.get("/daily-stock/2024-01-02").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Daily stock not found for 2024-01-02");

    let id = app.create_vegetable("Fennel").await;
    app.post(
        "/daily-stock",
        json!({"date": "2024-03-14", "vegetables": [{"id": id, "quantity": 7, "photo": "f.jpg"}]}),
    )
    .await;

    let (status, alias) = app.get("/daily-stock/previous-day").await;
    assert_eq!(status, StatusCode::OK);
    let (_, explicit) = app.get("/daily-stock/2024-03-14").await;
    assert_eq!(alias, explicit);
}

#[tokio::test]
async fn test_stock_entry_validation() {
    let app = TestApp::new().await;
    let id = app.create_vegetable("Okra").await;

    let cases = [
        (json!({"vegetables": "lots"}), "Vegetables must be an array"),
        (json!({}), "Vegetables must be an array"),
        (
            json!({"vegetables": [{"id": "xyz", "quantity": 1, "photo": "o.jpg"}]}),
            "Each vegetable must have a valid 24-character hexadecimal id",
        ),
        (
            json!({"vegetables": [{"id": id, "quantity": -2, "photo": "o.jpg"}]}),
            "Each vegetable must have a valid non-negative quantity",
        ),
        (
            json!({"vegetables": [{"id": id, "quantity": 1, "photo": ""}]}),
            "Each vegetable must have a non-empty photo URL",
        ),
    ];
    for (payload, message) in cases {
        let (status, body) = app.post("/daily-stock", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&body), message);
    }

    let (_, list) = app.get("/daily-stock").await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_unknown_vegetable_blocks_write() {
    let app = TestApp::new().await;
    let known = app.create_vegetable("Celery").await;

    let (status, body) = app
        .post(
            "/daily-stock",
            json!({"date": "2024-01-01", "vegetables": [
                {"id": known, "quantity": 1, "photo": "c.jpg"},
                {"id": UNKNOWN_ID, "quantity": 1, "photo": "u.jpg"}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(&body),
        format!("Vegetable with id {} not found", UNKNOWN_ID)
    );

    let (status, _) = app.get("/daily-stock/2024-01-01").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_replace_daily_stock() {
    let app = TestApp::new().await;
    let a = app.create_vegetable("Leek").await;
    let b = app.create_vegetable("Shallot").await;

    let (status, body) = app
        .put(
            "/daily-stock/2024-02-01",
            json!({"vegetables": [{"id": a, "quantity": 3, "photo": "a.jpg"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "2024-02-01");
    assert_eq!(body["message"], "Daily stock created");

    let (status, body) = app
        .put(
            "/daily-stock/2024-02-01",
            json!({"vegetables": [{"id": b, "quantity": 0, "photo": "b.jpg"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Daily stock updated");

    let (_, stock) = app.get("/daily-stock/2024-02-01").await;
    assert_eq!(
        stock["vegetables"],
        json!([{"id": b, "quantity": 0.0, "photo": "b.jpg"}])
    );
}

#[tokio::test]
async fn test_remove_stock_entry() {
    let app = TestApp::new().await;
    let a = app.create_vegetable("Yam").await;
    let b = app.create_vegetable("Taro").await;
    app.post(
        "/daily-stock",
        json!({"date": "2024-01-01", "vegetables": [
            {"id": a, "quantity": 1, "photo": "a.jpg"},
            {"id": b, "quantity": 2, "photo": "b.jpg"}
        ]}),
    )
    .await;

    let (status, body) = app
        .delete(&format!("/daily-stock/2024-01-01/vegetable/{}", a))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Vegetable removed from daily stock");

    let (_, before) = app.get("/daily-stock/2024-01-01").await;
    assert_eq!(
        before["vegetables"],
        json!([{"id": b, "quantity": 2.0, "photo": "b.jpg"}])
    );

    let (status, body) = app
        .delete(&format!("/daily-stock/2024-01-01/vegetable/{}", a))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Vegetable not found in daily stock");

    let (_, after) = app.get("/daily-stock/2024-01-01").await;
    assert_eq!(before, after);

    let (status, body) = app
        .delete(&format!("/daily-stock/2024-05-05/vegetable/{}", a))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Daily stock not found for this date");

    let (status, body) = app.delete("/daily-stock/2024-01-01/vegetable/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(&body),
        "Invalid vegetable ID format: Must be a 24-character hexadecimal string"
    );
}

#[tokio::test]
async fn test_list_and_delete_daily_stock() {
    let app = TestApp::new().await;
    let id = app.create_vegetable("Kohlrabi").await;
    for date in ["2024-01-03", "2024-01-01", "2024-01-02"] {
        app.post(
            "/daily-stock",
            json!({"date": date, "vegetables": [{"id": id, "quantity": 1, "photo": "k.jpg"}]}),
        )
        .await;
    }

    let (status, list) = app.get("/daily-stock").await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);

    let (status, body) = app.delete("/daily-stock/2024-01-02").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Daily stock deleted");

    let (status, body) = app.delete("/daily-stock/2024-01-02").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Daily stock not found for this date");
}

// ============================================================================
// Transport
// ============================================================================

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/carrots").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Endpoint not found");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send("POST", "/vegetables", Body::from("{not json"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error_of(&body).is_empty());
}

#[tokio::test]
async fn test_concurrent_merges_accumulate() {
    let app = TestApp::new().await;
    let id = app.create_vegetable("Parsnip").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = app.router.clone();
        let body = json!({"date": "2024-01-01", "vegetables": [{"id": id, "quantity": 1, "photo": "p.jpg"}]});
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method("POST")
                .uri("/daily-stock")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let (_, stock) = app.get("/daily-stock/2024-01-01").await;
    assert_eq!(stock["vegetables"][0]["quantity"], 8.0);
}

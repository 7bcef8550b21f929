//! End-to-end router tests over the in-memory store and a mock gateway.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Extension, Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use greenbasket_api::gateway::{GatewayError, PaymentGateway, SaleRequest, SaleResult};
use greenbasket_api::middleware::CurrentUser;
use greenbasket_api::models::ProductInput;
use greenbasket_api::routes;
use greenbasket_api::state::AppState;
use greenbasket_api::store::{CatalogStore, MemoryStore};
use greenbasket_core::{CategoryId, Price, ProductId, Slug, UserId};

/// Records sale requests; declines when `decline` is set.
#[derive(Default)]
struct MockGateway {
    decline: bool,
    sales: Mutex<Vec<SaleRequest>>,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn client_token(&self) -> Result<Value, GatewayError> {
        Ok(json!({"clientToken": "tok_test"}))
    }

    async fn sale(&self, request: SaleRequest) -> Result<SaleResult, GatewayError> {
        self.sales.lock().expect("lock").push(request);
        if self.decline {
            Err(GatewayError::Declined {
                payload: json!({"success": false, "message": "Insufficient Funds"}),
            })
        } else {
            Ok(SaleResult(
                json!({"success": true, "transaction": {"id": "txn_1"}}),
            ))
        }
    }
}

fn app(
    store: Arc<MemoryStore>,
    gateway: Arc<MockGateway>,
    user: Option<CurrentUser>,
) -> Router {
    let state = AppState::with_parts(store, gateway, None);
    let router = routes::routes().with_state(state);
    match user {
        Some(user) => router.layer(Extension(user)),
        None => router,
    }
}

fn alice() -> CurrentUser {
    CurrentUser {
        id: UserId::new(1),
        name: "Alice".to_owned(),
    }
}

fn bob() -> CurrentUser {
    CurrentUser {
        id: UserId::new(2),
        name: "Bob".to_owned(),
    }
}

fn product_input(name: &str, category: CategoryId, price: i64) -> ProductInput {
    ProductInput {
        name: name.to_owned(),
        slug: Slug::from_name(name),
        description: format!("{name} description"),
        price: Price::new(Decimal::new(price, 0)).expect("price"),
        quantity: 5,
        category_id: category,
        shipping: true,
        photo: None,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible router");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize")))
        .expect("request")
}

// --- Listings ---------------------------------------------------------------

#[tokio::test]
async fn listings_carry_no_photo_or_reviews() {
    let store = Arc::new(MemoryStore::new());
    let category = store.insert_category("Tea").await.expect("category");
    let mut input = product_input("Green Tea", category.id, 8);
    input.photo = Some(greenbasket_api::models::Photo {
        bytes: vec![1, 2, 3],
        content_type: "image/jpeg".to_owned(),
    });
    store.insert_product(input).await.expect("product");

    let router = app(store, Arc::new(MockGateway::default()), None);
    let (status, body) = send(&router, get("/api/products")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let first = body["products"]
        .as_array()
        .expect("array")
        .first()
        .expect("one product");
    assert_eq!(first["name"], "Green Tea");
    assert!(first.get("photo").is_none());
    assert!(first.get("reviews").is_none());
    assert_eq!(first["category"]["name"], "Tea");
}

#[tokio::test]
async fn filter_listing_and_count_agree() {
    let store = Arc::new(MemoryStore::new());
    let tea = store.insert_category("Tea").await.expect("category");
    let mugs = store.insert_category("Mugs").await.expect("category");
    for (name, cat, price) in [
        ("Green Tea", tea.id, 8),
        ("Black Tea", tea.id, 12),
        ("Oolong", tea.id, 18),
        ("Stone Mug", mugs.id, 25),
    ] {
        store
            .insert_product(product_input(name, cat, price))
            .await
            .expect("product");
    }

    let router = app(store, Arc::new(MockGateway::default()), None);
    let filter = json!({ "checked": [tea.id], "radio": [10, 20] });

    let (status, listed) =
        send(&router, json_request("POST", "/api/products/filter/1", &filter)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["products"].as_array().expect("array").len(), 2);

    let (status, counted) =
        send(&router, json_request("POST", "/api/products/filter-count", &filter)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counted["total"], 2);
}

#[tokio::test]
async fn page_windows_use_fixed_sizes() {
    let store = Arc::new(MemoryStore::new());
    let tea = store.insert_category("Tea").await.expect("category");
    for i in 0..10 {
        store
            .insert_product(product_input(&format!("Tea {i}"), tea.id, 10 + i))
            .await
            .expect("product");
    }

    let router = app(store, Arc::new(MockGateway::default()), None);

    // Filtered listings page by 8.
    let filter = json!({ "checked": [tea.id] });
    let (_, page1) = send(&router, json_request("POST", "/api/products/filter/1", &filter)).await;
    let (_, page2) = send(&router, json_request("POST", "/api/products/filter/2", &filter)).await;
    assert_eq!(page1["products"].as_array().expect("array").len(), 8);
    assert_eq!(page2["products"].as_array().expect("array").len(), 2);

    // The plain listing pages by 6.
    let (_, page1) = send(&router, get("/api/products/page/1")).await;
    let (_, page2) = send(&router, get("/api/products/page/2")).await;
    assert_eq!(page1["products"].as_array().expect("array").len(), 6);
    assert_eq!(page2["products"].as_array().expect("array").len(), 4);

    // Page zero clamps to page one.
    let (_, page0) = send(&router, get("/api/products/page/0")).await;
    assert_eq!(page0, page1);

    let (_, counted) = send(&router, get("/api/products/count")).await;
    assert_eq!(counted["total"], 10);
}

#[tokio::test]
async fn search_matches_name_and_description() {
    let store = Arc::new(MemoryStore::new());
    let tea = store.insert_category("Tea").await.expect("category");
    store
        .insert_product(product_input("Green Tea", tea.id, 8))
        .await
        .expect("product");
    store
        .insert_product(product_input("Stone Mug", tea.id, 25))
        .await
        .expect("product");

    let router = app(store, Arc::new(MockGateway::default()), None);

    let (_, body) = send(&router, get("/api/products/search/GREEN")).await;
    assert_eq!(body["products"].as_array().expect("array").len(), 1);

    // "description" appears in every seeded description.
    let (_, body) = send(&router, get("/api/products/search/description")).await;
    assert_eq!(body["products"].as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn related_excludes_self_and_caps_at_four() {
    let store = Arc::new(MemoryStore::new());
    let tea = store.insert_category("Tea").await.expect("category");
    let mut first = None;
    for i in 0..6 {
        let record = store
            .insert_product(product_input(&format!("Tea {i}"), tea.id, 10))
            .await
            .expect("product");
        first.get_or_insert(record.id);
    }
    let first = first.expect("seeded");

    let router = app(store, Arc::new(MockGateway::default()), None);
    let (status, body) = send(
        &router,
        get(&format!("/api/products/related/{first}/{}", tea.id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let related = body["products"].as_array().expect("array");
    assert_eq!(related.len(), 4);
    assert!(related.iter().all(|p| p["id"] != json!(first.as_i32())));
}

#[tokio::test]
async fn category_listing_returns_category_and_products() {
    let store = Arc::new(MemoryStore::new());
    let tea = store.insert_category("Loose Leaf Tea").await.expect("category");
    store
        .insert_product(product_input("Green Tea", tea.id, 8))
        .await
        .expect("product");

    let router = app(store, Arc::new(MockGateway::default()), None);
    let (status, body) = send(&router, get("/api/categories/loose-leaf-tea/products")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"]["name"], "Loose Leaf Tea");
    assert_eq!(body["products"].as_array().expect("array").len(), 1);

    let (status, _) = send(&router, get("/api/categories/ghosts/products")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Product CRUD and photos ------------------------------------------------

fn multipart_request(uri: &str, method: &str, parts: &[(&str, &str)]) -> Request<Body> {
    let boundary = "test-boundary";
    let mut body = String::new();
    for (name, value) in parts {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn create_product_validates_fields_in_order() {
    let store = Arc::new(MemoryStore::new());
    let router = app(store, Arc::new(MockGateway::default()), Some(alice()));

    // Name missing even though the description is present.
    let (status, body) = send(
        &router,
        multipart_request("/api/products", "POST", &[("description", "nice")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Name is Required");

    // Name present, description missing.
    let (status, body) = send(
        &router,
        multipart_request("/api/products", "POST", &[("name", "Mug")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Description is Required");
}

#[tokio::test]
async fn create_product_derives_slug_and_serves_detail() {
    let store = Arc::new(MemoryStore::new());
    let category = store.insert_category("Mugs").await.expect("category");
    let router = app(store, Arc::new(MockGateway::default()), Some(alice()));

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/products",
            "POST",
            &[
                ("name", "Stoneware Mug"),
                ("description", "hand glazed"),
                ("price", "25"),
                ("category", &category.id.as_i32().to_string()),
                ("quantity", "12"),
                ("shipping", "true"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["product"]["slug"], "stoneware-mug");

    let (status, body) = send(&router, get("/api/products/slug/stoneware-mug")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["name"], "Stoneware Mug");
    assert_eq!(body["product"]["reviews"], json!([]));
}

#[tokio::test]
async fn duplicate_product_names_are_tolerated() {
    let store = Arc::new(MemoryStore::new());
    let category = store.insert_category("Mugs").await.expect("category");
    let router = app(store, Arc::new(MockGateway::default()), Some(alice()));

    let cid = category.id.as_i32().to_string();
    let fields = |description| {
        [
            ("name", "Mug"),
            ("description", description),
            ("price", "10"),
            ("category", cid.as_str()),
            ("quantity", "3"),
        ]
    };

    let (status, _) = send(
        &router,
        multipart_request("/api/products", "POST", &fields("the first mug")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Same name, same derived slug. The second create still succeeds.
    let (status, _) = send(
        &router,
        multipart_request("/api/products", "POST", &fields("the second mug")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, counted) = send(&router, get("/api/products/count")).await;
    assert_eq!(counted["total"], 2);

    // Slug lookup resolves to the newest match.
    let (status, body) = send(&router, get("/api/products/slug/mug")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["description"], "the second mug");
}

#[tokio::test]
async fn create_product_requires_auth() {
    let store = Arc::new(MemoryStore::new());
    let router = app(store, Arc::new(MockGateway::default()), None);

    let (status, _) = send(
        &router,
        multipart_request("/api/products", "POST", &[("name", "Mug")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn photo_endpoint_serves_bytes_or_no_content() {
    let store = Arc::new(MemoryStore::new());
    let category = store.insert_category("Tea").await.expect("category");
    let mut with_photo = product_input("Green Tea", category.id, 8);
    with_photo.photo = Some(greenbasket_api::models::Photo {
        bytes: vec![0xFF, 0xD8, 0xFF],
        content_type: "image/jpeg".to_owned(),
    });
    let with_photo = store.insert_product(with_photo).await.expect("product");
    let without = store
        .insert_product(product_input("Black Tea", category.id, 12))
        .await
        .expect("product");

    let router = app(store, Arc::new(MockGateway::default()), None);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/products/{with_photo}/photo", with_photo = with_photo.id)))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/jpeg"
    );
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(bytes.as_ref(), &[0xFF, 0xD8, 0xFF]);

    let (status, _) = send(&router, get(&format!("/api/products/{}/photo", without.id))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// --- Reviews ----------------------------------------------------------------

async fn seed_one_product(store: &MemoryStore) -> ProductId {
    let category = store.insert_category("Tea").await.expect("category");
    store
        .insert_product(product_input("Green Tea", category.id, 8))
        .await
        .expect("product")
        .id
}

#[tokio::test]
async fn second_review_by_same_author_conflicts() {
    let store = Arc::new(MemoryStore::new());
    let product = seed_one_product(&store).await;
    let router = app(store.clone(), Arc::new(MockGateway::default()), Some(alice()));

    let draft = json!({ "body": "lovely", "rating": 5 });
    let uri = format!("/api/products/{product}/reviews");
    let (status, _) = send(&router, json_request("POST", &uri, &draft)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&router, json_request("POST", &uri, &draft)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Review already posted for this product");

    // The original review is the only one.
    let reviews = store
        .reviews_for_product(product)
        .await
        .expect("reviews")
        .expect("product exists");
    assert_eq!(reviews.len(), 1);
}

#[tokio::test]
async fn review_post_requires_auth_and_product() {
    let store = Arc::new(MemoryStore::new());
    let product = seed_one_product(&store).await;
    let draft = json!({ "body": "lovely", "rating": 5 });

    let anonymous = app(store.clone(), Arc::new(MockGateway::default()), None);
    let (status, _) = send(
        &anonymous,
        json_request("POST", &format!("/api/products/{product}/reviews"), &draft),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authed = app(store, Arc::new(MockGateway::default()), Some(alice()));
    let (status, _) = send(
        &authed,
        json_request("POST", "/api/products/999/reviews", &draft),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_author_cannot_update_or_delete() {
    let store = Arc::new(MemoryStore::new());
    let product = seed_one_product(&store).await;
    let as_alice = app(store.clone(), Arc::new(MockGateway::default()), Some(alice()));
    let as_bob = app(store.clone(), Arc::new(MockGateway::default()), Some(bob()));

    let (status, review) = send(
        &as_alice,
        json_request(
            "POST",
            &format!("/api/products/{product}/reviews"),
            &json!({ "body": "lovely", "rating": 5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let review_id = review["review"]["id"].as_i64().expect("review id");

    let (status, body) = send(
        &as_bob,
        json_request(
            "PUT",
            &format!("/api/reviews/{review_id}"),
            &json!({ "body": "meh", "rating": 2 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not authorized to update this review");

    let (status, _) = send(
        &as_bob,
        json_request(
            "DELETE",
            &format!("/api/products/{product}/reviews/{review_id}"),
            &json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Untouched after both rejections.
    let reviews = store
        .reviews_for_product(product)
        .await
        .expect("reviews")
        .expect("product exists");
    assert_eq!(reviews[0].body, "lovely");
    assert_eq!(reviews[0].rating.value(), 5);
}

#[tokio::test]
async fn author_can_edit_and_detail_hydrates_author() {
    let store = Arc::new(MemoryStore::new());
    let product = seed_one_product(&store).await;
    let router = app(store, Arc::new(MockGateway::default()), Some(alice()));

    let (_, review) = send(
        &router,
        json_request(
            "POST",
            &format!("/api/products/{product}/reviews"),
            &json!({ "body": "lovely", "rating": 5 }),
        ),
    )
    .await;
    let review_id = review["review"]["id"].as_i64().expect("review id");

    let (status, updated) = send(
        &router,
        json_request(
            "PUT",
            &format!("/api/reviews/{review_id}"),
            &json!({ "body": "still lovely", "rating": 4 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["review"]["body"], "still lovely");

    let (_, detail) = send(&router, get("/api/products/slug/green-tea")).await;
    let reviews = detail["product"]["reviews"].as_array().expect("reviews");
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["body"], "still lovely");
    assert_eq!(reviews[0]["author"]["name"], "Alice");
}

#[tokio::test]
async fn deleting_product_removes_its_reviews() {
    let store = Arc::new(MemoryStore::new());
    let product = seed_one_product(&store).await;
    let router = app(store.clone(), Arc::new(MockGateway::default()), Some(alice()));

    let (_, review) = send(
        &router,
        json_request(
            "POST",
            &format!("/api/products/{product}/reviews"),
            &json!({ "body": "lovely", "rating": 5 }),
        ),
    )
    .await;
    let review_id = review["review"]["id"].as_i64().expect("review id");

    let (status, _) = send(
        &router,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/products/{product}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, get("/api/products/slug/green-tea")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Editing the orphaned review reports it gone.
    let (status, _) = send(
        &router,
        json_request(
            "PUT",
            &format!("/api/reviews/{review_id}"),
            &json!({ "body": "gone", "rating": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Checkout ---------------------------------------------------------------

#[tokio::test]
async fn checkout_token_passes_gateway_payload_through() {
    let router = app(
        Arc::new(MemoryStore::new()),
        Arc::new(MockGateway::default()),
        None,
    );
    let (status, body) = send(&router, get("/api/checkout/token")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientToken"], "tok_test");
}

#[tokio::test]
async fn payment_charges_cart_total_and_persists_order() {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockGateway::default());
    let router = app(store.clone(), gateway.clone(), Some(alice()));

    let body = json!({
        "cart": [
            { "product": { "price": 10, "name": "Kit" } },
            { "product": { "price": 25 } },
            { "product": { "price": 3 } }
        ],
        "nonce": "nonce-abc"
    });
    let (status, response) =
        send(&router, json_request("POST", "/api/checkout/payment", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "ok": true }));

    let sales = gateway.sales.lock().expect("lock");
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].amount, Decimal::new(38, 0));
    assert!(sales[0].submit_for_settlement);

    let orders = store.orders().expect("orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].buyer, UserId::new(1));
    assert_eq!(orders[0].payment["transaction"]["id"], "txn_1");
    // Extra cart fields survive verbatim.
    assert_eq!(orders[0].cart[0].product.rest["name"], "Kit");
}

#[tokio::test]
async fn payment_registers_buyer_before_order_write() {
    let store = Arc::new(MemoryStore::new());
    let router = app(store.clone(), Arc::new(MockGateway::default()), Some(alice()));

    // Alice has never posted a review, so nothing else has recorded her.
    let body = json!({
        "cart": [{ "product": { "price": 10 } }],
        "nonce": "nonce-abc"
    });
    let (status, _) = send(&router, json_request("POST", "/api/checkout/payment", &body)).await;
    assert_eq!(status, StatusCode::OK);

    // The buyer row exists, so the order's buyer reference can resolve.
    let authors = store.authors().expect("authors");
    assert!(
        authors
            .iter()
            .any(|a| a.id == UserId::new(1) && a.name == "Alice")
    );
    assert_eq!(store.orders().expect("orders")[0].buyer, UserId::new(1));
}

#[tokio::test]
async fn declined_payment_creates_no_order() {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockGateway {
        decline: true,
        ..MockGateway::default()
    });
    let router = app(store.clone(), gateway, Some(alice()));

    let body = json!({
        "cart": [{ "product": { "price": 10 } }],
        "nonce": "nonce-abc"
    });
    let (status, response) =
        send(&router, json_request("POST", "/api/checkout/payment", &body)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(response["success"], false);
    assert_eq!(response["error"]["message"], "Insufficient Funds");
    assert!(store.orders().expect("orders").is_empty());
}

#[tokio::test]
async fn payment_requires_auth() {
    let router = app(
        Arc::new(MemoryStore::new()),
        Arc::new(MockGateway::default()),
        None,
    );
    let body = json!({ "cart": [], "nonce": "n" });
    let (status, _) = send(&router, json_request("POST", "/api/checkout/payment", &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// --- Health -----------------------------------------------------------------

#[tokio::test]
async fn health_endpoints_respond() {
    let router = app(
        Arc::new(MemoryStore::new()),
        Arc::new(MockGateway::default()),
        None,
    );
    let (status, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    // No pool behind this state, so readiness is a plain OK.
    let (status, body) = send(&router, get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

use std::time::Duration;

use corral::{CollectionState, LoadOutcome, PolicyConfig};
use corral_admin::model::RecordStatus;
use corral_admin::{CreateProduct, Dashboard, Upload};
use corral_configuration::DashboardConfig;
use corral_reqwest::ExportFormat;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dashboard(server: &MockServer) -> Dashboard {
    let mut config = DashboardConfig::builtin(server.uri());
    config.defaults.debounce = Duration::from_millis(50);
    Dashboard::new(config).unwrap()
}

fn product(i: u32) -> Value {
    json!({
        "_id": format!("p{i}"),
        "title": format!("Product {i}"),
        "type": "tools",
        "price": f64::from(i),
        "availableQuantity": i,
        "status": "active"
    })
}

fn product_page(page: u32) -> Value {
    let first = (page - 1) * 10 + 1;
    let last = (page * 10).min(35);
    json!({
        "data": (first..=last).map(product).collect::<Vec<_>>(),
        "pagination": {"total": 35, "page": page, "limit": 10, "totalPages": 4}
    })
}

fn order(id: &str, first_name: &str) -> Value {
    json!({
        "_id": id,
        "createdAt": "2025-02-01T09:00:00Z",
        "status": "delivered",
        "totalAmount": 120.0,
        "region": "North",
        "user": {"_id": "u1", "firstName": first_name, "lastName": "Doe", "email": "jd@example.com"}
    })
}

async fn mount_products(server: &MockServer) {
    for page in 1..=4 {
        Mock::given(method("GET"))
            .and(path("/product/all"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(product_page(page)))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn second_page_of_products() {
    let server = MockServer::start().await;
    mount_products(&server).await;
    let dashboard = dashboard(&server);

    let products = dashboard.products().unwrap();
    assert_eq!(products.load().await, LoadOutcome::Applied);
    assert_eq!(products.next_page().await, LoadOutcome::Applied);

    let view = products.view();
    let ids: Vec<&str> = view.items().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["p11", "p12", "p13", "p14", "p15", "p16", "p17", "p18", "p19", "p20"]
    );
    assert_eq!(view.total_pages(), Some(4));
    assert_eq!(view.state, CollectionState::Ready);
}

#[tokio::test]
async fn expired_pages_are_evicted_once_unused() {
    let server = MockServer::start().await;
    mount_products(&server).await;
    let mut config = DashboardConfig::builtin(server.uri());
    config.defaults.policy =
        PolicyConfig::enabled(Duration::from_millis(20), Duration::from_millis(40));
    let dashboard = Dashboard::new(config).unwrap();

    let products = dashboard.products().unwrap();
    products.load().await;
    for _ in 2..=4 {
        assert_eq!(products.next_page().await, LoadOutcome::Applied);
    }
    assert!(!dashboard.cache().is_empty());

    drop(products);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(dashboard.cache().len(), 0);
}

#[tokio::test]
async fn deleting_a_product_refreshes_inventory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/inventories"))
        .and(query_param("region", "North"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"_id": "i1", "title": "Drill", "availableQuantity": 4, "totalOrderedQuantity": 1}],
            "pagination": {"total": 1, "page": 1, "limit": 10, "totalPages": 1}
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/product/p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "message": "Product deleted"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let dashboard = dashboard(&server);

    let inventory = dashboard.inventory("North").unwrap();
    inventory.load().await;
    assert_eq!(inventory.view().items()[0].remaining(), 3);

    let result = dashboard.delete_product("p1").await.unwrap();
    assert_eq!(result.message, "Product deleted");
    assert_eq!(result.affected, vec!["products", "inventory", "analytics"]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(inventory.view().state, CollectionState::Ready);
    server.verify().await;
}

#[tokio::test]
async fn invalid_product_is_never_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/product/create"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let dashboard = dashboard(&server);

    let form = CreateProduct {
        title: "Drill".into(),
        description: "Cordless drill with two batteries".into(),
        kind: "tools".into(),
        size: "M".into(),
        price: 0.0,
        available_quantity: 5,
        status: RecordStatus::Active,
        role: "maintenance".into(),
        sku: None,
        region: None,
        images: Vec::new(),
    };
    let err = dashboard.add_product(&form).await.unwrap_err();
    assert_eq!(err.user_message(), "Please check: price");
    server.verify().await;
}

#[tokio::test]
async fn employee_import_reports_rejected_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/employer-register"))
        .and(body_string_contains("name=\"file\"; filename=\"staff.csv\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "message": "Import finished",
            "data": {
                "total": 3,
                "success": 2,
                "failed": 1,
                "errors": [{"identifier": "bob@example.com", "reason": "Email already exists"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dashboard = dashboard(&server);

    let csv = Upload::csv("staff.csv", "firstName,email\nBob,bob@example.com\n");
    let result = dashboard.import_users(&csv).await.unwrap();
    let summary = result.import_summary().unwrap();
    assert_eq!((summary.total, summary.success, summary.failed), (3, 2, 1));
    assert_eq!(summary.errors[0].reason, "Email already exists");
    assert_eq!(result.affected, vec!["users"]);
}

#[tokio::test]
async fn balance_update_patches_one_field() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/user/update/u7"))
        .and(body_json(json!({"balance": 250.0})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Updated"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let dashboard = dashboard(&server);

    dashboard.update_user_balance("u7", 250.0).await.unwrap();
    let err = dashboard.update_user_balance("u7", -5.0).await.unwrap_err();
    assert_eq!(err.user_message(), "Please check: balance");
    server.verify().await;
}

#[tokio::test]
async fn analytics_are_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"totalOrders": 12, "totalProducts": 35, "totalUsers": 8}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dashboard = dashboard(&server);

    let first = dashboard.analytics().await.unwrap();
    let second = dashboard.analytics().await.unwrap();
    assert_eq!(first.total_products, 35);
    assert_eq!(first, second);
    server.verify().await;
}

#[tokio::test]
async fn order_search_uses_its_own_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/order/get-all"))
        .and(query_param("searchTerm", "jane"))
        .and(query_param("region", "North"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [order("o2", "Jane")],
            "meta": {"page": 1, "limit": 10, "total": 1, "totalPage": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/order/get-all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [order("o1", "John"), order("o2", "Jane")],
            "meta": {"page": 1, "limit": 10, "total": 2, "totalPage": 1}
        })))
        .mount(&server)
        .await;
    let dashboard = dashboard(&server);

    let orders = dashboard.orders(Some("North")).unwrap();
    orders.load().await;
    assert_eq!(orders.view().items().len(), 2);

    orders.on_search_input("jane");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let view = orders.view();
    assert_eq!(view.query.debounced_search, "jane");
    assert_eq!(view.items()[0].customer_name().as_deref(), Some("Jane Doe"));
    assert_eq!(view.items().len(), 1);
    server.verify().await;
}

#[tokio::test]
async fn export_downloads_a_named_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/export/csv"))
        .and(query_param("search", "doe"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("firstName,lastName\nJane,Doe\n", "text/csv"),
        )
        .mount(&server)
        .await;
    let dashboard = dashboard(&server);

    let file = dashboard
        .export("users", ExportFormat::Csv, "doe")
        .await
        .unwrap();
    assert_eq!(file.file_name, "users_list.csv");
    assert_eq!(file.content_type, "text/csv");
    assert!(file.bytes.starts_with(b"firstName"));
}

#[tokio::test]
async fn relative_base_url_is_rejected() {
    let err = Dashboard::builtin("api.example.com").unwrap_err();
    assert!(matches!(err, corral_admin::AdminError::Config(_)));
}

use chrono::NaiveDate;
use erp_engine::backend::{BackendClient, BackendConfig, PriceLookup};
use erp_engine::draft::{submit, DocumentDraft};
use erp_engine::models::GlobalDiscount;
use erp_engine::orders::LineField;
use erp_engine::pricing::{select_price_list, Catalog};
use erp_engine::EngineError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> BackendClient {
    BackendClient::new(BackendConfig {
        base_url: format!("{}/api", server.uri()),
        timeout: Duration::from_secs(5),
        auth_token: None,
    })
    .unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/inventory/productsInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"inventory": [], "products": [
                {"_id": "p1", "name": "Widget", "unitPrice": 10},
                {"_id": "p2", "name": "Gadget", "unitPrice": 4}
            ]}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/procurement-advanced/price-lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {"_id": "general", "priceListName": "Everyone", "customerId": null, "status": "Active"},
                {"_id": "vip", "priceListName": "VIP", "customerId": "c1", "status": "Active"}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_order_priced_from_price_list_and_submitted() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/procurement-advanced/price-lists/get-price"))
        .and(query_param("productId", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "price": 8, "basePrice": 10, "discountPercent": 20
        })))
        .mount(&server)
        .await;
    // p2 is not on any list
    Mock::given(method("GET"))
        .and(path("/api/procurement-advanced/price-lists/get-price"))
        .and(query_param("productId", "p2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false, "message": "No price found"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/CustomerOrder"))
        .and(body_partial_json(json!({
            "customer": "c1",
            "items": [
                {"product": "p1", "quantity": 5.0, "unitPrice": 8.0, "discount": 0.0},
                {"product": "p2", "quantity": 2.0, "unitPrice": 4.0, "discount": 0.0}
            ],
            "globalDiscount": {"type": "fixed", "value": 6.0},
            "taxRate": 17.0
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true, "data": {"_id": "o1", "orderNumber": "SO-1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = backend(&server);
    let catalog = Catalog::new(&client.products().await.unwrap());
    let lists = client.customer_price_lists().await.unwrap();

    let mut draft = DocumentDraft::order(day());
    draft.set_customer(Some("c1".into()));
    draft.select_price_list(select_price_list(&lists, "c1").cloned());
    assert_eq!(draft.price_list().map(|l| l.id.as_str()), Some("vip"));
    draft.set_tax_rate(17.0);

    let ticket = draft.edit_line(0, LineField::Product("p1".into())).unwrap();
    draft.reprice(&client, &catalog, ticket.into_iter().collect()).await;
    let ticket = draft.edit_line(0, LineField::Quantity(5.0)).unwrap();
    draft.reprice(&client, &catalog, ticket.into_iter().collect()).await;

    let line = draft.add_line();
    let ticket = draft.edit_line(line, LineField::Product("p2".into())).unwrap();
    draft.edit_line(line, LineField::Discount(10.0)).unwrap();
    draft.reprice(&client, &catalog, ticket.into_iter().collect()).await;
    let ticket = draft.edit_line(line, LineField::Quantity(2.0)).unwrap();
    draft.reprice(&client, &catalog, ticket.into_iter().collect()).await;

    assert_eq!(draft.items()[0].unit_price, 8.0);
    assert_eq!(draft.items()[0].base_price, Some(10.0));
    assert_eq!(draft.items()[1].unit_price, 4.0);
    assert_eq!(draft.items()[1].base_price, None);

    draft.set_global_discount(GlobalDiscount::fixed(6.0));
    let totals = draft.totals();
    assert_eq!(totals.subtotal, 42.0);
    assert_eq!(totals.discount_amount, 6.0);
    assert_eq!(totals.total_amount, 42.0 + 42.0 * 0.17);

    let created = submit(&client, &draft).await.unwrap();
    assert_eq!(created["orderNumber"], "SO-1");
}

#[tokio::test]
async fn test_invalid_invoice_never_reaches_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/invoices"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = backend(&server);
    let mut draft = DocumentDraft::invoice(day());
    draft.edit_line(0, LineField::Description("Setup".into())).unwrap();
    draft.edit_line(0, LineField::UnitPrice(100.0)).unwrap();
    draft.edit_line(0, LineField::Quantity(0.0)).unwrap();

    let err = submit(&client, &draft).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_invoice_submitted_with_party_and_due_date() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/invoices"))
        .and(body_partial_json(json!({
            "customerId": "c7",
            "recordType": "customer",
            "partyId": "c7",
            "issueDate": "2024-06-01",
            "dueDate": "2024-07-01",
            "paymentTerms": "Net 30",
            "items": [{"description": "Setup", "quantity": 2.0, "unitPrice": 100.0, "discount": 10.0, "total": 180.0}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true, "data": {"_id": "inv9"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = backend(&server);
    let mut draft = DocumentDraft::invoice(day());
    draft.set_customer(Some("c7".into()));
    draft.edit_line(0, LineField::Description("Setup".into())).unwrap();
    draft.edit_line(0, LineField::Quantity(2.0)).unwrap();
    draft.edit_line(0, LineField::UnitPrice(100.0)).unwrap();
    draft.edit_line(0, LineField::Discount(10.0)).unwrap();

    let created = submit(&client, &draft).await.unwrap();
    assert_eq!(created["_id"], "inv9");
}

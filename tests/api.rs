use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use landed_cost_allocator::{api, LandedCostCalculator};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    api::stateless_routes(Arc::new(LandedCostCalculator::default()))
}

async fn post(uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn sample_voucher() -> Value {
    json!({
        "name": "LCV-2025-0001",
        "distribute_charges_based_on": "Qty",
        "items": [
            {"id": "row-1", "item_code": "RAW-A", "amount": "500", "qty": "5"},
            {"id": "row-2", "item_code": "RAW-B", "amount": "300", "qty": "5"}
        ],
        "taxes": [
            {"id": "tax-1", "amount": "50", "expense_account": "Droits NGP - TN", "tag": "X"},
            {"id": "tax-2", "amount": "20", "expense_account": "Droits NGP - TN", "tag": "Z"}
        ]
    })
}

#[tokio::test]
async fn health_check_answers_ok() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn recompute_applies_tagged_charge_and_reports_unmatched_tag() {
    let body = json!({
        "voucher": sample_voucher(),
        "item_tags": {"RAW-A": "X", "RAW-B": "Y"}
    });
    let (status, bytes) = post("/api/landed-cost/recompute", body).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["success"], true);
    let outcome = &value["outcome"];
    assert_eq!(outcome["voucher"], "LCV-2025-0001");
    assert_eq!(outcome["basis"], "Qty");

    let items = outcome["items"].as_array().unwrap();
    assert_eq!(items[0]["id"], "row-1");
    assert_eq!(items[0]["applicable_charges"], "50.00");
    assert_eq!(items[1]["applicable_charges"], "0.00");

    let trace: Vec<&str> = outcome["trace"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(trace.contains(&"No item found for tag Z"));
}

#[tokio::test]
async fn duplicate_item_ids_are_unprocessable() {
    let body = json!({
        "voucher": {
            "items": [
                {"id": "row-1", "item_code": "A", "amount": "1", "qty": "1"},
                {"id": "row-1", "item_code": "B", "amount": "1", "qty": "1"}
            ]
        }
    });
    let (status, bytes) = post("/api/landed-cost/recompute", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["success"], false);
    assert!(value["message"].as_str().unwrap().contains("row-1"));
}

#[tokio::test]
async fn csv_export_lists_every_item() {
    let body = json!({
        "voucher": sample_voucher(),
        "item_tags": {"RAW-A": "X"}
    });
    let (status, bytes) = post("/api/landed-cost/recompute/csv", body).await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,item_code,amount,applicable_charges,final_value");
    assert_eq!(lines[1], "row-1,RAW-A,500.00,50.00,550.00");
    assert_eq!(lines[2], "row-2,RAW-B,300.00,0.00,300.00");
}

#[tokio::test]
async fn numeric_json_amounts_come_back_at_money_scale() {
    let body = json!({
        "voucher": {
            "distribute_charges_based_on": "Amount",
            "items": [
                {"id": "row-1", "item_code": "A", "amount": 10.1, "qty": 1},
                {"id": "row-2", "item_code": "B", "amount": 20.2, "qty": 1}
            ],
            "taxes": [{"id": "tax-1", "amount": 0.1, "expense_account": "Freight - TN"}]
        }
    });
    let (status, bytes) = post("/api/landed-cost/recompute", body).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&bytes).unwrap();
    let items = value["outcome"]["items"].as_array().unwrap();
    assert_eq!(items[0]["amount"], "10.10");
    assert_eq!(items[0]["applicable_charges"], "0.03");
    assert_eq!(items[1]["applicable_charges"], "0.07");
    assert_eq!(items[1]["final_value"], "20.27");
}

#[tokio::test]
async fn batch_returns_outcomes_in_request_order() {
    let second = json!({
        "name": "LCV-2025-0002",
        "distribute_charges_based_on": "Amount",
        "items": [
            {"id": "a", "item_code": "A", "amount": "60", "qty": "1"},
            {"id": "b", "item_code": "B", "amount": "40", "qty": "1"}
        ],
        "taxes": [{"id": "freight", "amount": "100", "expense_account": "Freight - TN"}]
    });
    let body = json!({
        "requests": [
            {"voucher": sample_voucher(), "item_tags": {"RAW-A": "X"}},
            {"voucher": second}
        ]
    });
    let (status, bytes) = post("/api/landed-cost/recompute/batch", body).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&bytes).unwrap();
    let outcomes = value["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["voucher"], "LCV-2025-0001");
    assert_eq!(outcomes[1]["voucher"], "LCV-2025-0002");
    assert_eq!(outcomes[1]["summary"]["total_charges"], "100.00");
    assert_eq!(outcomes[1]["journal"]["debit_stock"], "200.00");
}

#[tokio::test]
async fn visit_period_is_derived_from_period_type() {
    let body = json!({
        "customer": "CUST-0001",
        "period_type": "Current Quarter",
        "today": "2025-05-17"
    });
    let (status, bytes) = post("/api/visit-target/period", body).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["row"]["start_date"], "2025-04-01");
    assert_eq!(value["row"]["end_date"], "2025-06-30");
    assert_eq!(value["window"]["read_only"], true);
}

#[tokio::test]
async fn visit_period_requires_customer_or_territory() {
    let body = json!({"period_type": "Current Month", "today": "2025-05-17"});
    let (status, _) = post("/api/visit-target/period", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn submitted_visit_increments_first_matching_row() {
    let body = json!({
        "rows": [
            {"customer": "CUST-0002", "start_date": "2025-01-01", "end_date": "2025-12-31"},
            {"customer": "CUST-0001", "start_date": "2025-05-01", "end_date": "2025-05-31", "completed_visits": 2},
            {"customer": "CUST-0001", "start_date": "2025-01-01", "end_date": "2025-12-31"}
        ],
        "visit": {"name": "SVL-0001", "sales_person": "SP-01", "visit_date": "2025-05-31", "customer": "CUST-0001"}
    });
    let (status, bytes) = post("/api/visit-target/visits", body).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["matched_row"], 2);
    assert_eq!(value["rows"][1]["completed_visits"], 3);
    assert_eq!(value["rows"][2]["completed_visits"], 0);
}

#[tokio::test]
async fn target_rows_check_names_the_offending_row() {
    let body = json!({"rows": [{"customer": "CUST-0001"}, {"period_type": "Current Month"}]});
    let (status, bytes) = post("/api/visit-target/rows/validate", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(value["message"].as_str().unwrap().contains("Row #2"));
}

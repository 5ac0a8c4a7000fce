//! End-to-end boundary tests: every operation goes in by name with
//! positional JSON arguments and comes back as an envelope.

use serde_json::{json, Value};

use khata_bridge::{Bridge, Request};
use khata_db::DbConfig;

async fn test_bridge() -> Bridge {
    let bridge = Bridge::new();
    bridge.init(DbConfig::in_memory()).await.unwrap();
    bridge
}

async fn call(bridge: &Bridge, op: &str, args: Vec<Value>) -> Value {
    bridge.dispatch(op, &args).await.to_value()
}

#[tokio::test]
async fn uninitialized_bridge_answers_with_failure_envelope() {
    let bridge = Bridge::new();

    let reply = call(&bridge, "get-all-customers", vec![]).await;
    assert_eq!(reply["success"], json!(false));
    assert!(reply["error"].as_str().unwrap().contains("not initialized"));
}

#[tokio::test]
async fn shutdown_guards_later_dispatches() {
    let bridge = test_bridge().await;
    bridge.shutdown().await;

    let reply = call(&bridge, "get-all-customers", vec![]).await;
    assert_eq!(reply["success"], json!(false));
}

#[tokio::test]
async fn unknown_operation_is_a_failure_envelope() {
    let bridge = test_bridge().await;

    let reply = call(&bridge, "telnet-to-mainframe", vec![]).await;
    assert_eq!(reply["success"], json!(false));
    assert!(reply["error"].as_str().unwrap().contains("telnet-to-mainframe"));
}

#[tokio::test]
async fn customer_lifecycle_envelopes() {
    let bridge = test_bridge().await;

    // create: { success, data: entity }
    let created = call(&bridge, "create-customer", vec![json!({ "name": "Asha" })]).await;
    assert_eq!(created["success"], json!(true));
    assert_eq!(created["data"]["name"], json!("Asha"));
    assert_eq!(created["data"]["credit_balance"], json!(0.0));
    let id = created["data"]["id"].as_i64().unwrap();

    // filter: { success, data: [entities] }
    let filtered = call(&bridge, "filter-customers", vec![json!({ "name": "Ash" })]).await;
    assert_eq!(filtered["success"], json!(true));
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);

    // update: { success, data: rows, changes }
    let updated = call(
        &bridge,
        "update-customer",
        vec![json!(id), json!({ "phone": "12345" })],
    )
    .await;
    assert_eq!(updated["success"], json!(true));
    assert_eq!(updated["changes"], json!(1));
    assert_eq!(updated["data"][0]["phone"], json!("12345"));

    // empty update set: error, not a no-op success
    let rejected = call(&bridge, "update-customer", vec![json!(id), json!({})]).await;
    assert_eq!(rejected["success"], json!(false));

    // delete hit: { success: true, data: [row], changes: 1 }
    let deleted = call(&bridge, "delete-customer", vec![json!(id)]).await;
    assert_eq!(deleted["success"], json!(true));
    assert_eq!(deleted["changes"], json!(1));

    // delete miss: success:false + empty data, NOT an error envelope
    let missed = call(&bridge, "delete-customer", vec![json!(id)]).await;
    assert_eq!(missed["success"], json!(false));
    assert_eq!(missed["data"], json!([]));
    assert!(missed.get("error").is_none());
}

#[tokio::test]
async fn invoice_composite_envelopes() {
    let bridge = test_bridge().await;

    let customer = call(&bridge, "create-customer", vec![json!({ "name": "Buyer" })]).await;
    let cust_id = customer["data"]["id"].as_i64().unwrap();

    let product = call(
        &bridge,
        "create-product",
        vec![json!({
            "fs_sku": "SKU-1", "fs_prod_id": "p1", "fs_variation_id": "v1",
            "fs_category_id": "c1", "category_name": "General",
            "prod_name": "Widget", "price": 10.0, "stock": 5
        })],
    )
    .await;
    assert_eq!(product["success"], json!(true));
    let prod_id = product["data"]["id"].as_i64().unwrap();

    // create-invoice: { success, createdInvoice: { ..., invoice_items } }
    let created = call(
        &bridge,
        "create-invoice",
        vec![
            json!({
                "invoice_id": "INV-1", "cust_id": cust_id,
                "total_amount": 100.0, "add_on": 10.0, "discount": 5.0
            }),
            json!([{ "item_id": prod_id, "sku": "SKU-1", "price": 10.0, "qty": 5 }]),
        ],
    )
    .await;
    assert_eq!(created["success"], json!(true));
    assert_eq!(created["createdInvoice"]["net_amount"], json!(105.0));
    assert_eq!(
        created["createdInvoice"]["invoice_items"][0]["amount"],
        json!(50.0)
    );

    // get-invoice by business key: { success, invoice: ... }
    let fetched = call(&bridge, "get-invoice", vec![json!("INV-1")]).await;
    assert_eq!(fetched["success"], json!(true));
    assert_eq!(fetched["invoice"]["invoice_id"], json!("INV-1"));

    // not-found lookups ARE error envelopes (unlike customer delete)
    let missing = call(&bridge, "get-invoice", vec![json!("INV-404")]).await;
    assert_eq!(missing["success"], json!(false));
    assert!(missing["error"].as_str().unwrap().contains("not found"));

    // update-invoice: replacement item list + field update
    let updated = call(
        &bridge,
        "update-invoice",
        vec![
            json!("INV-1"),
            json!({ "status": "paid" }),
            json!([{ "item_id": prod_id, "price": 12.0, "qty": 2 }]),
        ],
    )
    .await;
    assert_eq!(updated["success"], json!(true));
    assert_eq!(updated["updatedInvoice"]["status"], json!("paid"));
    assert_eq!(
        updated["updatedInvoice"]["invoice_items"][0]["amount"],
        json!(24.0)
    );

    // delete-invoice: { success, changes }
    let deleted = call(&bridge, "delete-invoice", vec![json!("INV-1")]).await;
    assert_eq!(deleted, json!({ "success": true, "changes": 1 }));
    let missed = call(&bridge, "delete-invoice", vec![json!("INV-1")]).await;
    assert_eq!(missed, json!({ "success": false, "changes": 0 }));
}

#[tokio::test]
async fn transaction_operations_settle_balances() {
    let bridge = test_bridge().await;

    let customer = call(&bridge, "create-customer", vec![json!({ "name": "Payer" })]).await;
    let cust_id = customer["data"]["id"].as_i64().unwrap();

    let invoice = call(
        &bridge,
        "create-invoice",
        vec![json!({ "invoice_id": "INV-2", "cust_id": cust_id, "total_amount": 100.0 })],
    )
    .await;
    let invoice_pk = invoice["createdInvoice"]["id"].as_i64().unwrap();

    let txn = call(
        &bridge,
        "create-transaction",
        vec![json!({
            "transaction_id": "TXN-1", "invoice_id": invoice_pk,
            "amount": 40.0, "transaction_type": "payment", "status": "completed"
        })],
    )
    .await;
    assert_eq!(txn["success"], json!(true));

    let listed = call(&bridge, "get-invoice-transactions", vec![json!(invoice_pk)]).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let customers = call(&bridge, "filter-customers", vec![json!({ "id": cust_id })]).await;
    assert_eq!(customers["data"][0]["credit_balance"], json!(40.0));

    // Reassigning the owning invoice is rejected
    let txn_id = txn["data"]["id"].as_i64().unwrap();
    let rejected = call(
        &bridge,
        "update-transaction",
        vec![json!(txn_id), json!({ "invoice_id": 999 })],
    )
    .await;
    assert_eq!(rejected["success"], json!(false));
}

#[tokio::test]
async fn product_filter_is_a_union_across_fields() {
    let bridge = test_bridge().await;

    for (n, name) in [(1, "amla oil"), (2, "brass lock")] {
        let created = call(
            &bridge,
            "create-product",
            vec![json!({
                "fs_sku": format!("SKU-{n}"), "fs_prod_id": format!("p{n}"),
                "fs_variation_id": format!("v{n}"), "fs_category_id": format!("c{n}"),
                "category_name": "General", "prod_name": name, "price": 5.0
            })],
        )
        .await;
        assert_eq!(created["success"], json!(true));
    }

    let hits = call(
        &bridge,
        "filter-products",
        vec![json!({ "prod_name": "amla", "fs_sku": "SKU-2" })],
    )
    .await;
    assert_eq!(hits["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn payment_method_operations() {
    let bridge = test_bridge().await;

    let created = call(
        &bridge,
        "create-payment-method",
        vec![json!("HDFC Current"), json!("50100-223-11")],
    )
    .await;
    assert_eq!(created["success"], json!(true));

    let listed = call(&bridge, "get-payment-methods", vec![]).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn serialized_requests_dispatch_identically() {
    let bridge = test_bridge().await;

    let request: Request = serde_json::from_value(json!({
        "op": "create-customer",
        "args": [{ "name": "From Wire" }]
    }))
    .unwrap();

    let reply = bridge.dispatch_request(&request).await.to_value();
    assert_eq!(reply["success"], json!(true));
    assert_eq!(reply["data"]["name"], json!("From Wire"));
}

//! End-to-end workflows over a real socket.

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{Value, json};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{authed_client, spawn_test_app, test_config};

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> Result<(StatusCode, Value)> {
    let response = client.post(url).json(&body).send().await?;
    let status = response.status();
    Ok((status, response.json().await.unwrap_or(Value::Null)))
}

async fn get_json(client: &reqwest::Client, url: String) -> Result<(StatusCode, Value)> {
    let response = client.get(url).send().await?;
    let status = response.status();
    Ok((status, response.json().await.unwrap_or(Value::Null)))
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn public_endpoints_need_no_auth() -> Result<()> {
    let server = spawn_test_app(test_config()).await?;
    let client = reqwest::Client::new();

    for path in ["/", "/healthz", "/readyz", "/openapi.json"] {
        let response = client.get(server.url(path)).send().await?;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }

    let response = client.get(server.url("/api/products")).send().await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    server.shutdown().await
}

#[tokio::test]
async fn purchase_sale_and_void_move_stock() -> Result<()> {
    let server = spawn_test_app(test_config()).await?;
    let client = authed_client();

    let (status, product) = post_json(
        &client,
        server.url("/api/products"),
        json!({ "code": "CLAVO-2", "name": "Clavos 2\"", "price_cents": 150 }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["stock"], 0);
    let product_id = id_of(&product);

    let (status, purchase) = post_json(
        &client,
        server.url("/api/purchases"),
        json!({
            "supplier_name": "Importadora Andes",
            "items": [{ "product_id": product_id, "quantity": 100, "unit_cost_cents": 90 }]
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["purchase"]["total_cents"], 9000);

    let (_, product) = get_json(&client, server.url(&format!("/api/products/{product_id}"))).await?;
    assert_eq!(product["stock"], 100);

    let (status, sale) = post_json(
        &client,
        server.url("/api/sales"),
        json!({
            "items": [{ "product_id": product_id, "quantity": 40 }],
            "payments": [{ "method": "card", "amount_cents": 6000 }]
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let sale_id = sale["sale"]["id"].as_str().unwrap().to_string();

    let (_, product) = get_json(&client, server.url(&format!("/api/products/{product_id}"))).await?;
    assert_eq!(product["stock"], 60);

    let (status, low) = get_json(&client, server.url("/api/products/low-stock?threshold=60")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(low["pagination"]["total"], 1);

    let (status, voided) = post_json(
        &client,
        server.url(&format!("/api/sales/{sale_id}/void")),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voided["sale"]["status"], "voided");

    let (_, product) = get_json(&client, server.url(&format!("/api/products/{product_id}"))).await?;
    assert_eq!(product["stock"], 100);

    let (status, again) = post_json(
        &client,
        server.url(&format!("/api/sales/{sale_id}/void")),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["code"], "SALE_ALREADY_VOIDED");

    server.shutdown().await
}

#[tokio::test]
async fn currency_conversion_and_exchange() -> Result<()> {
    let server = spawn_test_app(test_config()).await?;
    let client = authed_client();

    let (status, _) = post_json(
        &client,
        server.url("/api/currencies"),
        json!({ "code": "USD", "name": "DÓLARES AMERICANOS", "symbol": "$", "rate_micros": 6_960_000 }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, conversion) = get_json(
        &client,
        server.url("/api/currencies/convert?from=USD&to=BOB&amount_cents=1000"),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(conversion["result_cents"], 6960);

    let (status, unknown) = get_json(
        &client,
        server.url("/api/currencies/convert?from=EUR&to=BOB&amount_cents=1000"),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown["code"], "UNKNOWN_CURRENCY");

    let (status, exchange) = post_json(
        &client,
        server.url("/api/exchanges"),
        json!({ "from_code": "BOB", "to_code": "USD", "amount_cents": 69600 }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(exchange["result_cents"], 10000);

    server.shutdown().await
}

#[tokio::test]
async fn school_fee_payments_default_to_course_fee() -> Result<()> {
    let server = spawn_test_app(test_config()).await?;
    let client = authed_client();

    let (_, school) = post_json(
        &client,
        server.url("/api/schools"),
        json!({ "name": "Academia Musical Sol" }),
    )
    .await?;
    let (status, course) = post_json(
        &client,
        server.url("/api/courses"),
        json!({ "school_id": id_of(&school), "name": "Guitarra I", "monthly_fee_cents": 25000 }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let course_id = id_of(&course);

    let (status, payment) = post_json(
        &client,
        server.url("/api/fee-payments"),
        json!({ "course_id": course_id, "student_name": "Mateo", "period": "2025-03" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["amount_cents"], 25000);

    let (status, _) = post_json(
        &client,
        server.url("/api/fee-payments"),
        json!({ "course_id": course_id, "student_name": "Mateo", "period": "2025-03" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, bad_period) = post_json(
        &client,
        server.url("/api/fee-payments"),
        json!({ "course_id": course_id, "student_name": "Mateo", "period": "03-2025" }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(bad_period["details"]["period"].is_string());

    let (_, courses) = get_json(
        &client,
        server.url(&format!("/api/schools/{}/courses", id_of(&school))),
    )
    .await?;
    assert_eq!(courses["pagination"]["total"], 1);

    let (_, payments) = get_json(
        &client,
        server.url(&format!("/api/courses/{course_id}/fee-payments?period=2025-03")),
    )
    .await?;
    assert_eq!(payments["pagination"]["total"], 1);

    server.shutdown().await
}

#[tokio::test]
async fn tournament_finalize_and_roster() -> Result<()> {
    let server = spawn_test_app(test_config()).await?;
    let client = authed_client();

    let (_, tournament) = post_json(
        &client,
        server.url("/api/tournaments"),
        json!({ "name": "Copa Barrio", "starts_on": "2025-05-01" }),
    )
    .await?;
    let tournament_id = id_of(&tournament);

    let (_, final_match) = post_json(
        &client,
        server.url("/api/matches"),
        json!({
            "tournament_id": tournament_id,
            "home_team": "Leones",
            "away_team": "Tigres",
            "stage": "final",
            "home_score": 1,
            "away_score": 3
        }),
    )
    .await?;
    let match_id = id_of(&final_match);

    let (status, early) = get_json(
        &client,
        server.url(&format!("/api/tournaments/{tournament_id}/roster")),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(early["code"], "TOURNAMENT_NOT_FINALIZED");

    for (name, document, team) in [
        ("Carla Mendez", "111", "Tigres"),
        ("Bruno Paz", "222", "Tigres"),
        ("Diego Soria", "333", "Leones"),
    ] {
        let (status, player) = post_json(
            &client,
            server.url("/api/players"),
            json!({ "full_name": name, "document_number": document }),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = post_json(
            &client,
            server.url(&format!("/api/matches/{match_id}/players")),
            json!({ "player_id": id_of(&player), "team": team }),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, finished) = post_json(
        &client,
        server.url(&format!("/api/tournaments/{tournament_id}/finalize")),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["champion_team"], "Tigres");
    assert_eq!(finished["runner_up_team"], "Leones");

    let (status, roster) = get_json(
        &client,
        server.url(&format!("/api/tournaments/{tournament_id}/roster")),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster["champion"]["team"], "Tigres");
    let champions: Vec<&str> = roster["champion"]["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["full_name"].as_str().unwrap())
        .collect();
    assert_eq!(champions, vec!["Bruno Paz", "Carla Mendez"]);
    assert_eq!(roster["runner_up"]["players"].as_array().unwrap().len(), 1);

    server.shutdown().await
}

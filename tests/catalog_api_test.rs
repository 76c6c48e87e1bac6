mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use rental_api::entities::status::ItemType;

use common::{booking_draft, day, decimal, line_for, response_json, TestApp};

#[tokio::test]
async fn admin_manages_costumes_end_to_end() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gothic", ItemType::Costume).await;

    let created = app
        .request_as_admin(
            Method::POST,
            "/api/v1/costumes",
            Some(json!({
                "name": "Vampire Cape",
                "category_id": category.id,
                "price_per_day": "20.00",
                "security_deposit": "40.00",
                "sizes": ["M", "L"],
                "themes": ["Halloween", "Gothic"]
            })),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = response_json(created).await;
    let costume = &created["data"];
    assert_eq!(costume["status"], "available");
    assert_eq!(costume["item_type"], "costume");
    assert_eq!(costume["themes"], json!(["Halloween", "Gothic"]));
    assert!(costume.get("linked_characters").is_none());
    let id = costume["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/costumes/{}", id);

    let updated = app
        .request_as_admin(
            Method::PUT,
            &uri,
            Some(json!({"price_per_day": "25.50", "sizes": ["S", "M", "L"]})),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = response_json(updated).await;
    assert_eq!(decimal(&updated["data"]["price_per_day"]), dec!(25.50));
    assert_eq!(updated["data"]["sizes"], json!(["S", "M", "L"]));
    assert_eq!(updated["data"]["name"], "Vampire Cape");

    let status = app
        .request_as_admin(
            Method::PUT,
            &format!("{}/status", uri),
            Some(json!({"status": "cleaning"})),
        )
        .await;
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(response_json(status).await["data"]["status"], "cleaning");

    let fetched = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(fetched.status(), StatusCode::OK);

    let deleted = app.request_as_admin(Method::DELETE, &uri, None).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_writes_require_admin() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gothic", ItemType::Costume).await;
    let body = json!({
        "name": "Vampire Cape",
        "category_id": category.id,
        "price_per_day": "20.00"
    });

    let anonymous = app
        .request(Method::POST, "/api/v1/costumes", Some(body.clone()), None)
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let (_, customer) = app.customer_token();
    let as_customer = app
        .request(Method::POST, "/api/v1/costumes", Some(body), Some(&customer))
        .await;
    assert_eq!(as_customer.status(), StatusCode::FORBIDDEN);

    let forged = app
        .request(Method::GET, "/api/v1/costumes", None, Some("not-a-jwt"))
        .await;
    assert_eq!(forged.status(), StatusCode::OK);
}

#[tokio::test]
async fn item_category_must_match_its_catalog() {
    let app = TestApp::new().await;
    let props = app.seed_category("Props", ItemType::Accessory).await;

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/costumes",
            Some(json!({
                "name": "Pirate Coat",
                "category_id": props.id,
                "price_per_day": "15.00"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = response_json(response).await["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains("category_id"));

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/accessories",
            Some(json!({
                "name": "Hook",
                "category_id": props.id,
                "price_per_day": "-1",
                "themes": ["Pirates"]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_lists_filter_and_paginate() {
    let app = TestApp::new().await;
    let cape = app.seed_costume("Vampire Cape", dec!(20)).await;
    app.seed_costume("Witch Dress", dec!(18)).await;
    app.seed_costume("Werewolf Suit", dec!(30)).await;
    app.seed_accessory("Vampire Fangs", dec!(2)).await;
    app.set_item_status(&cape, rental_api::entities::status::ItemStatus::Damaged)
        .await;

    let page = app
        .request(Method::GET, "/api/v1/costumes?limit=2&page=1", None, None)
        .await;
    assert_eq!(page.status(), StatusCode::OK);
    let page = response_json(page).await;
    assert_eq!(page["data"]["total"], 3);
    assert_eq!(page["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["data"]["total_pages"], 2);

    let search = app
        .request(Method::GET, "/api/v1/costumes?search=Vampire", None, None)
        .await;
    let search = response_json(search).await;
    assert_eq!(search["data"]["total"], 1);
    assert_eq!(search["data"]["items"][0]["name"], "Vampire Cape");

    let damaged = app
        .request(Method::GET, "/api/v1/costumes?status=damaged", None, None)
        .await;
    assert_eq!(response_json(damaged).await["data"]["total"], 1);

    let by_category = app
        .request(
            Method::GET,
            &format!("/api/v1/costumes?category_id={}", cape.category_id),
            None,
            None,
        )
        .await;
    assert_eq!(response_json(by_category).await["data"]["total"], 1);

    let accessories = app
        .request(Method::GET, "/api/v1/accessories", None, None)
        .await;
    let accessories = response_json(accessories).await;
    assert_eq!(accessories["data"]["total"], 1);
    assert_eq!(
        accessories["data"]["items"][0]["linked_characters"],
        json!(["Dracula"])
    );
}

#[tokio::test]
async fn booked_item_cannot_be_deleted() {
    let app = TestApp::new().await;
    let cape = app.seed_costume("Vampire Cape", dec!(20)).await;
    app.state
        .services
        .bookings
        .create_booking(None, booking_draft(day(1), day(2)), vec![line_for(&cape)])
        .await
        .unwrap();

    let response = app
        .request_as_admin(
            Method::DELETE,
            &format!("/api/v1/costumes/{}", cape.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn categories_are_listed_by_type_and_guarded_on_delete() {
    let app = TestApp::new().await;

    let created = app
        .request_as_admin(
            Method::POST,
            "/api/v1/categories",
            Some(json!({"name": "Superheroes", "type": "costume"})),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = response_json(created).await;
    assert_eq!(created["data"]["type"], "costume");
    let category_id = created["data"]["id"].as_str().unwrap().to_string();

    app.seed_category("Hats", ItemType::Accessory).await;

    let costumes_only = app
        .request(Method::GET, "/api/v1/categories?type=costume", None, None)
        .await;
    let costumes_only = response_json(costumes_only).await;
    let names: Vec<&str> = costumes_only["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Superheroes"]);

    app.state
        .services
        .catalog
        .create_item(
            ItemType::Costume,
            common::item_draft("Caped Crusader", category_id.parse().unwrap(), dec!(35)),
        )
        .await
        .unwrap();

    let uri = format!("/api/v1/categories/{}", category_id);
    let blocked = app.request_as_admin(Method::DELETE, &uri, None).await;
    assert_eq!(blocked.status(), StatusCode::CONFLICT);

    let renamed = app
        .request_as_admin(Method::PUT, &uri, Some(json!({"name": "Heroes"})))
        .await;
    assert_eq!(renamed.status(), StatusCode::OK);
    assert_eq!(response_json(renamed).await["data"]["name"], "Heroes");

    let (_, customer) = app.customer_token();
    let denied = app
        .request(Method::DELETE, &uri, None, Some(&customer))
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unused_category_can_be_deleted() {
    let app = TestApp::new().await;
    let category = app.seed_category("Masks", ItemType::Accessory).await;
    let uri = format!("/api/v1/categories/{}", category.id);

    let deleted = app.request_as_admin(Method::DELETE, &uri, None).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = app
        .request(
            Method::GET,
            &format!("/api/v1/categories/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

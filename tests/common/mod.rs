#![allow(dead_code)]

use std::{str::FromStr, sync::Arc};

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use rental_api::{
    auth::Role,
    config::AppConfig,
    db,
    entities::{
        category,
        status::{ItemStatus, ItemType},
    },
    events::{self, Event},
    services::{
        bookings::{BookingDraft, BookingItemDraft},
        catalog::{InventoryItem, ItemDraft},
        categories::CategoryDraft,
    },
    AppState,
};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Application state and router over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    events: Mutex<mpsc::Receiver<Event>>,
    admin_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_database("sqlite::memory:", 1).await
    }

    /// Builds the app over `database_url` with a pool of up to `max_connections`.
    pub async fn with_database(database_url: &str, max_connections: u32) -> Self {
        let mut cfg = AppConfig::new(
            database_url.to_string(),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = max_connections;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(1024);
        let state = AppState::new(Arc::new(pool), cfg, Some(Arc::new(event_sender)));

        let admin_token = state
            .auth
            .issue_token(
                Uuid::new_v4(),
                Role::Admin,
                Some("Front Desk".into()),
                None,
            )
            .expect("sign admin token");

        let router = Router::new()
            .nest("/api/v1", rental_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            events: Mutex::new(event_rx),
            admin_token,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Signs a customer token and returns it with the customer's id.
    pub fn customer_token(&self) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let token = self
            .state
            .auth
            .issue_token(
                user_id,
                Role::Customer,
                Some("Morticia".into()),
                Some("morticia@example.com".into()),
            )
            .expect("sign customer token");
        (user_id, token)
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.admin_token())).await
    }

    /// Every event emitted so far.
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut drained = Vec::new();
        while let Ok(event) = rx.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub async fn seed_category(&self, name: &str, category_type: ItemType) -> category::Model {
        self.state
            .services
            .categories
            .create_category(CategoryDraft {
                name: name.to_string(),
                description: None,
                category_type,
            })
            .await
            .expect("seed category")
    }

    pub async fn seed_costume(&self, name: &str, price_per_day: Decimal) -> InventoryItem {
        let category = self.seed_category(&format!("{} costumes", name), ItemType::Costume).await;
        self.state
            .services
            .catalog
            .create_item(
                ItemType::Costume,
                ItemDraft {
                    sizes: vec!["S".into(), "M".into(), "L".into()],
                    themes: vec!["Halloween".into()],
                    ..item_draft(name, category.id, price_per_day)
                },
            )
            .await
            .expect("seed costume")
    }

    pub async fn seed_accessory(&self, name: &str, price_per_day: Decimal) -> InventoryItem {
        let category = self
            .seed_category(&format!("{} accessories", name), ItemType::Accessory)
            .await;
        self.state
            .services
            .catalog
            .create_item(
                ItemType::Accessory,
                ItemDraft {
                    linked_characters: vec!["Dracula".into()],
                    ..item_draft(name, category.id, price_per_day)
                },
            )
            .await
            .expect("seed accessory")
    }

    pub async fn item_status(&self, item: &InventoryItem) -> ItemStatus {
        self.state
            .services
            .catalog
            .get_item(item.item_type, item.id)
            .await
            .expect("load item")
            .status
    }

    pub async fn set_item_status(&self, item: &InventoryItem, status: ItemStatus) {
        self.state
            .services
            .catalog
            .set_status(item.item_type, item.id, status)
            .await
            .expect("set item status");
    }
}

pub fn item_draft(name: &str, category_id: Uuid, price_per_day: Decimal) -> ItemDraft {
    ItemDraft {
        name: name.to_string(),
        description: None,
        category_id,
        price_per_day,
        security_deposit: Decimal::ZERO,
        sizes: Vec::new(),
        themes: Vec::new(),
        linked_characters: Vec::new(),
        image_url: None,
    }
}

pub fn booking_draft(start: DateTime<Utc>, end: DateTime<Utc>) -> BookingDraft {
    BookingDraft {
        customer_name: "Wednesday Addams".into(),
        customer_email: "wednesday@example.com".into(),
        customer_phone: Some("555-0100".into()),
        start_date: start,
        end_date: end,
        total_amount: None,
        security_deposit: None,
        status: None,
        payment_status: None,
        notes: None,
    }
}

pub fn line_for(item: &InventoryItem) -> BookingItemDraft {
    BookingItemDraft {
        item_type: item.item_type,
        item_id: item.id,
        item_name: item.name.clone(),
        size: None,
        price_per_day: item.price_per_day,
        quantity: 1,
    }
}

/// Midnight UTC `days` from today.
pub fn day(days: i64) -> DateTime<Utc> {
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight")
        .and_utc();
    midnight + Duration::days(days)
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Reads a decimal that was serialized as a JSON string.
pub fn decimal(value: &Value) -> Decimal {
    let raw = value.as_str().expect("decimal serialized as string");
    Decimal::from_str(raw).expect("valid decimal")
}

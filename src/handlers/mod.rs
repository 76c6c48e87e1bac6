pub mod bookings;
pub mod catalog;
pub mod categories;
pub mod common;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    booking_status::BookingStatusService, bookings::BookingService, catalog::CatalogService,
    categories::CategoryService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub categories: Arc<CategoryService>,
    pub bookings: Arc<BookingService>,
    pub booking_status: Arc<BookingStatusService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(db_pool.clone(), event_sender.clone())),
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            bookings: Arc::new(BookingService::new(db_pool.clone(), event_sender.clone())),
            booking_status: Arc::new(BookingStatusService::new(db_pool, event_sender)),
        }
    }
}

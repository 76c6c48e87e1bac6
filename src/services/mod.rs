// Pure pricing, overlap and overdue rules
pub mod rental_rules;

// Catalog management
pub mod catalog;
pub mod categories;

// Booking engine
pub mod booking_status;
pub mod bookings;

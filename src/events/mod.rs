use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::status::{BookingStatus, ItemStatus, ItemType, PaymentStatus};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted after a booking or catalog change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        booking_id: Uuid,
        item_count: usize,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    },
    BookingStatusChanged {
        booking_id: Uuid,
        old_status: BookingStatus,
        new_status: BookingStatus,
    },
    PaymentStatusChanged {
        booking_id: Uuid,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
    },
    ItemStatusChanged {
        item_id: Uuid,
        item_type: ItemType,
        old_status: ItemStatus,
        new_status: ItemStatus,
    },
}

/// Creates the bounded event channel shared by all services.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Returns when every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::BookingCreated {
                booking_id,
                item_count,
                start_date,
                end_date,
            } => info!(
                booking_id = %booking_id,
                item_count,
                start_date = %start_date,
                end_date = %end_date,
                "booking created"
            ),
            Event::BookingStatusChanged {
                booking_id,
                old_status,
                new_status,
            } => info!(
                booking_id = %booking_id,
                old_status = %old_status,
                new_status = %new_status,
                "booking status changed"
            ),
            Event::PaymentStatusChanged {
                booking_id,
                old_status,
                new_status,
            } => info!(
                booking_id = %booking_id,
                old_status = %old_status,
                new_status = %new_status,
                "payment status changed"
            ),
            Event::ItemStatusChanged {
                item_id,
                item_type,
                old_status,
                new_status,
            } => info!(
                item_id = %item_id,
                item_type = %item_type,
                old_status = %old_status,
                new_status = %new_status,
                "item status changed"
            ),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_the_receiver_in_order() {
        let (sender, mut rx) = channel(4);
        let booking_id = Uuid::new_v4();
        sender
            .send(Event::BookingStatusChanged {
                booking_id,
                old_status: BookingStatus::Active,
                new_status: BookingStatus::Completed,
            })
            .await
            .unwrap();
        sender
            .send(Event::PaymentStatusChanged {
                booking_id,
                old_status: PaymentStatus::Pending,
                new_status: PaymentStatus::Paid,
            })
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(Event::BookingStatusChanged { .. })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(Event::PaymentStatusChanged { .. })
        ));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (sender, rx) = channel(1);
        drop(rx);
        let result = sender
            .send(Event::ItemStatusChanged {
                item_id: Uuid::new_v4(),
                item_type: ItemType::Costume,
                old_status: ItemStatus::Available,
                new_status: ItemStatus::Rented,
            })
            .await;
        assert!(result.is_err());
        // logged, not propagated
        sender
            .send_or_log(Event::BookingCreated {
                booking_id: Uuid::new_v4(),
                item_count: 1,
                start_date: Utc::now(),
                end_date: Utc::now(),
            })
            .await;
    }

    #[tokio::test]
    async fn processor_stops_when_senders_drop() {
        let (sender, rx) = channel(2);
        let handle = tokio::spawn(process_events(rx));
        sender
            .send_or_log(Event::BookingStatusChanged {
                booking_id: Uuid::new_v4(),
                old_status: BookingStatus::Active,
                new_status: BookingStatus::Cancelled,
            })
            .await;
        drop(sender);
        handle.await.unwrap();
    }
}

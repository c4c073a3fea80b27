use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Account events
    UserRegistered(Uuid),
    EmailVerified(Uuid),
    PasswordReset(Uuid),

    // Listing events
    ListingCreated(Uuid),
    ListingUpdated(Uuid),
    ListingDeactivated(Uuid),
    ListingRestored(Uuid),

    // Enquiry events
    EnquiryCreated {
        enquiry_id: Uuid,
        listing_id: Uuid,
    },
    EnquiryReplied(Uuid),

    // Cart events
    CartItemAdded {
        cart_id: Uuid,
        listing_id: Uuid,
    },
    CartItemRemoved {
        cart_id: Uuid,
        listing_id: Uuid,
    },
    CartDeleted(Uuid),

    // Payment events
    PaymentInitialized {
        payment_id: Uuid,
        reference: String,
    },
    PaymentVerified {
        payment_id: Uuid,
        reference: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing the failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a full or closed channel is logged, not fatal.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Drains the event channel. Events are currently consumed for the log
/// stream only; integrations subscribe here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PaymentVerified {
                payment_id,
                reference,
            } => {
                info!(%payment_id, %reference, "payment verified");
            }
            Event::PaymentInitialized {
                payment_id,
                reference,
            } => {
                info!(%payment_id, %reference, "payment initialized");
            }
            other => info!(event = ?other, "event received"),
        }
    }

    info!("Event processing loop stopped");
}

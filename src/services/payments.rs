use crate::{
    auth::AuthUser,
    entities::{cart, cart_item, listing, payment, Cart, CartItem, Payment, PaymentModel},
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::{InitializeOutcome, InitializeTransaction, PaymentGateway},
    services::carts::CartService,
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Checkout against the payment gateway.
///
/// Lifecycle is deliberately small: a Payment row is created at
/// initialization and mutated exactly once, when a verify call finds the
/// gateway-side transaction successful. There is no failed state, no expiry
/// and no webhook path; verification only happens when a caller asks for it.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: Arc<EventSender>,
    callback_url: String,
}

/// Result of a successful initialization.
#[derive(Debug, Serialize)]
pub struct InitializedPayment {
    /// Hosted checkout session the caller is redirected to
    pub payment_url: String,
    pub reference: String,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Arc<EventSender>,
        callback_url: String,
    ) -> Self {
        Self {
            db,
            gateway,
            event_sender,
            callback_url,
        }
    }

    /// Starts a checkout for the caller's unpaid cart.
    ///
    /// The total is computed from the items' current listing prices, never
    /// from what the user saw when adding them. The stored amount is the
    /// gateway's minor-unit integer; a declined gateway response is handed
    /// back verbatim and persists nothing.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn initialize(&self, user: &AuthUser) -> Result<InitializedPayment, ServiceError> {
        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user.user_id))
            .filter(cart::Column::IsPaid.eq(false))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("Cart not found or already paid".to_string())
            })?;

        let total = CartService::cart_total(&*self.db, cart.id).await?;
        let amount = to_minor_units(total);
        let reference = Uuid::new_v4().to_string();

        let outcome = self
            .gateway
            .initialize_transaction(InitializeTransaction {
                email: user.email.clone(),
                amount,
                reference: reference.clone(),
                callback_url: self.callback_url.clone(),
            })
            .await?;

        match outcome {
            InitializeOutcome::Accepted { authorization_url } => {
                let row = payment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user.user_id),
                    cart_id: Set(cart.id),
                    amount: Set(amount),
                    reference: Set(reference.clone()),
                    verified: Set(false),
                    created_at: Set(Utc::now()),
                };
                let row = row.insert(&*self.db).await?;

                self.event_sender
                    .send_or_log(Event::PaymentInitialized {
                        payment_id: row.id,
                        reference: reference.clone(),
                    })
                    .await;

                info!(%reference, amount, "payment initialized");
                Ok(InitializedPayment {
                    payment_url: authorization_url,
                    reference,
                })
            }
            InitializeOutcome::Declined { body } => {
                warn!(%reference, "gateway declined initialization");
                Err(ServiceError::GatewayDeclined(body))
            }
        }
    }

    /// Confirms a transaction by reference against the gateway.
    ///
    /// On a successful gateway status the payment is marked verified, the
    /// cart is marked paid and every listing in it is deactivated, all
    /// inside one transaction, so a crash can not leave the three writes
    /// half-applied. Re-verifying a reference repeats the same writes and is
    /// therefore harmless.
    ///
    /// The reference is not bound to any caller; this mirrors the checkout
    /// flow this service replaces and is documented as a known gap.
    #[instrument(skip(self))]
    pub async fn verify(&self, reference: &str) -> Result<PaymentModel, ServiceError> {
        let outcome = self.gateway.verify_transaction(reference).await?;

        if !outcome.is_success() {
            return Err(ServiceError::PaymentVerificationFailed);
        }

        let txn = self.db.begin().await?;

        let found = Payment::find()
            .filter(payment::Column::Reference.eq(reference))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        let cart_id = found.cart_id;
        let payment_id = found.id;

        let mut verified: payment::ActiveModel = found.into();
        verified.verified = Set(true);
        let updated = verified.update(&txn).await?;

        let cart = Cart::find_by_id(cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;
        let mut paid: cart::ActiveModel = cart.into();
        paid.is_paid = Set(true);
        paid.update(&txn).await?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(crate::entities::Listing)
            .all(&txn)
            .await?;

        let mut deactivated = Vec::new();
        for (_, maybe_listing) in items {
            if let Some(found_listing) = maybe_listing {
                let listing_id = found_listing.id;
                let mut inactive: listing::ActiveModel = found_listing.into();
                inactive.is_active = Set(false);
                inactive.update(&txn).await?;
                deactivated.push(listing_id);
            }
        }

        txn.commit().await?;

        for listing_id in deactivated {
            self.event_sender
                .send_or_log(Event::ListingDeactivated(listing_id))
                .await;
        }
        self.event_sender
            .send_or_log(Event::PaymentVerified {
                payment_id,
                reference: reference.to_string(),
            })
            .await;

        info!(%reference, "payment verified");
        Ok(updated)
    }
}

/// Converts a decimal total to the gateway's minor-unit integer: multiply by
/// 100 and truncate.
fn to_minor_units(total: Decimal) -> i64 {
    (total * Decimal::from(100)).trunc().to_i64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_for_two_decimal_prices() {
        assert_eq!(to_minor_units(dec!(100.00)), 10000);
        assert_eq!(to_minor_units(dec!(250.50)), 25050);
        assert_eq!(to_minor_units(dec!(100.00) + dec!(250.50)), 35050);
    }

    #[test]
    fn minor_units_truncate_sub_cent_fractions() {
        assert_eq!(to_minor_units(dec!(10.999)), 1099);
        assert_eq!(to_minor_units(dec!(0.009)), 0);
    }

    #[test]
    fn minor_units_of_zero() {
        assert_eq!(to_minor_units(Decimal::ZERO), 0);
    }
}

use crate::{
    entities::{cart, cart_item, Cart, CartItem, CartItemModel, CartModel, Listing, ListingModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Per-user cart management.
///
/// The cart is created lazily on the first add and deleted outright when its
/// last item is removed; an empty cart never persists. The total is always
/// the sum of the items' *current* listing prices, never a snapshot.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// One cart line with its listing joined in.
#[derive(Debug, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub listing: ListingModel,
    pub added_at: DateTime<Utc>,
}

/// Cart plus its lines and the computed total.
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<CartLine>,
    pub total_price: Decimal,
}

/// What happened to the cart when an item was removed.
#[derive(Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    RemovedAndCartDeleted,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the caller's cart with items and total.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Listing)
            .all(&*self.db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut total_price = Decimal::ZERO;
        for (item, listing) in rows {
            let listing = listing.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "cart item {} references a missing listing",
                    item.id
                ))
            })?;
            total_price += listing.price;
            items.push(CartLine {
                id: item.id,
                listing,
                added_at: item.added_at,
            });
        }

        Ok(CartWithItems {
            cart,
            items,
            total_price,
        })
    }

    /// Adds a listing to the caller's cart, creating the cart if absent.
    ///
    /// Fails with `NotFound` unless the listing is active and published, and
    /// with `Conflict` if the listing is already in the cart.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<CartItemModel, ServiceError> {
        let txn = self.db.begin().await?;

        let listing = Listing::find_by_id(listing_id)
            .filter(crate::entities::listing::Column::IsActive.eq(true))
            .filter(crate::entities::listing::Column::IsPublished.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Listing {} not found", listing_id)))?;

        let cart = match Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
        {
            Some(cart) => cart,
            None => {
                let new_cart = cart::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    is_paid: Set(false),
                    created_at: Set(Utc::now()),
                };
                new_cart.insert(&txn).await?
            }
        };

        let already_present = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ListingId.eq(listing.id))
            .count(&txn)
            .await?
            > 0;
        if already_present {
            return Err(ServiceError::Conflict(
                "Listing already in cart".to_string(),
            ));
        }

        let item = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart.id),
            listing_id: Set(listing.id),
            added_at: Set(Utc::now()),
        };
        let item = item.insert(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                listing_id: listing.id,
            })
            .await;

        info!("Added listing {} to cart {}", listing.id, cart.id);
        Ok(item)
    }

    /// Removes a listing from the caller's cart. When the last item goes,
    /// the cart row goes with it.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<RemoveOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ListingId.eq(listing_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Listing not found in cart".to_string()))?;

        item.delete(&txn).await?;

        let remaining = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .count(&txn)
            .await?;

        let cart_id = cart.id;
        let outcome = if remaining == 0 {
            cart.delete(&txn).await?;
            RemoveOutcome::RemovedAndCartDeleted
        } else {
            RemoveOutcome::Removed
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id,
                listing_id,
            })
            .await;
        if outcome == RemoveOutcome::RemovedAndCartDeleted {
            self.event_sender
                .send_or_log(Event::CartDeleted(cart_id))
                .await;
        }

        Ok(outcome)
    }

    /// Sum of the current listing prices of a cart's items.
    pub async fn cart_total<C: ConnectionTrait>(
        conn: &C,
        cart_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Listing)
            .all(conn)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|(_, listing)| listing.as_ref().map(|l| l.price))
            .sum())
    }
}

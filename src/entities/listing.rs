use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Property listing. Deactivated, never deleted, once purchased.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub agent_id: Uuid,
    pub title: String,
    pub kind: ListingKind,
    pub description: String,
    pub state: String,
    pub country: String,
    pub location: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    /// Size in square meters
    pub area_sqm: i32,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub price: Decimal,
    pub is_published: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AgentId",
        to = "super::user::Column::Id"
    )]
    Agent,
    #[sea_orm(has_many = "super::enquiry::Entity")]
    Enquiries,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::enquiry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enquiries.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A listing can be added to a cart or enquired about only while it is
    /// both active and published.
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.is_published
    }
}

/// Sale or rental listing
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::EnumString,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ListingKind {
    #[sea_orm(string_value = "sale")]
    Sale,
    #[sea_orm(string_value = "rent")]
    Rent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(ListingKind::from_str("sale").unwrap(), ListingKind::Sale);
        assert_eq!(ListingKind::from_str("RENT").unwrap(), ListingKind::Rent);
        assert!(ListingKind::from_str("lease").is_err());
    }

    #[test]
    fn purchasable_requires_active_and_published() {
        let mut listing = Model {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            title: "Two-bed flat".to_string(),
            kind: ListingKind::Sale,
            description: String::new(),
            state: "Lagos".to_string(),
            country: "Nigeria".to_string(),
            location: "Lekki".to_string(),
            bedrooms: 2,
            bathrooms: 1,
            area_sqm: 80,
            price: Decimal::new(10000, 2),
            is_published: true,
            is_active: true,
            created_at: Utc::now(),
        };
        assert!(listing.is_purchasable());

        listing.is_published = false;
        assert!(!listing.is_purchasable());

        listing.is_published = true;
        listing.is_active = false;
        assert!(!listing.is_purchasable());
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account profile carrying the marketplace role
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub role: Role,
    #[sea_orm(nullable)]
    pub phone: Option<String>,
    #[sea_orm(nullable)]
    pub country_id: Option<Uuid>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id"
    )]
    Country,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Marketplace role. The historical spellings ("agent", "renter", "buyer",
/// "renter/buyer", any casing) are accepted once at the boundary via
/// [`Role::parse`]; everywhere else the closed enum is compared by equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "agent")]
    Agent,
    #[sea_orm(string_value = "renter_buyer")]
    RenterBuyer,
}

impl Role {
    /// Normalizes a raw role string into the closed enum.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "agent" => Some(Role::Agent),
            "renter" | "buyer" | "renter/buyer" | "renter_buyer" => Some(Role::RenterBuyer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("agent", Role::Agent)]
    #[case("Agent", Role::Agent)]
    #[case(" AGENT ", Role::Agent)]
    #[case("renter", Role::RenterBuyer)]
    #[case("BUYER", Role::RenterBuyer)]
    #[case("Renter/Buyer", Role::RenterBuyer)]
    #[case("renter_buyer", Role::RenterBuyer)]
    fn parses_known_spellings(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(Role::parse(raw), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("landlord")]
    #[case("admin")]
    fn rejects_unknown_spellings(#[case] raw: &str) {
        assert_eq!(Role::parse(raw), None);
    }
}

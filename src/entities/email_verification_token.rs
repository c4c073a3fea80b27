use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TOKEN_TTL_MINUTES: i64 = 15;

/// One-shot email verification code, upserted per user on each (re)send
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_verification_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub token: String,
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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.created_at > Duration::minutes(TOKEN_TTL_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_expires_after_fifteen_minutes() {
        let fresh = Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "A1B2C3".to_string(),
            created_at: Utc::now(),
        };
        assert!(!fresh.is_expired());

        let stale = Model {
            created_at: Utc::now() - Duration::minutes(16),
            ..fresh
        };
        assert!(stale.is_expired());
    }
}

use crate::{
    entities::{country, Country, CountryModel},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
pub struct CreateCountryInput {
    pub name: String,
    pub code: String,
    pub currency_code: String,
    pub currency_symbol: String,
}

#[derive(Debug, Default)]
pub struct UpdateCountryInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub currency_code: Option<String>,
    pub currency_symbol: Option<String>,
}

/// Country reference data, maintained by staff.
#[derive(Clone)]
pub struct CountryService {
    db: Arc<DatabaseConnection>,
}

impl CountryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<CountryModel>, ServiceError> {
        Ok(Country::find()
            .order_by_asc(country::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn create(&self, input: CreateCountryInput) -> Result<CountryModel, ServiceError> {
        let row = country::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            code: Set(input.code),
            currency_code: Set(input.currency_code),
            currency_symbol: Set(input.currency_symbol),
        };

        Ok(row.insert(&*self.db).await?)
    }

    pub async fn update(
        &self,
        country_id: Uuid,
        input: UpdateCountryInput,
    ) -> Result<CountryModel, ServiceError> {
        let found = Country::find_by_id(country_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Country not found".to_string()))?;

        let mut active: country::ActiveModel = found.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(code) = input.code {
            active.code = Set(code);
        }
        if let Some(currency_code) = input.currency_code {
            active.currency_code = Set(currency_code);
        }
        if let Some(currency_symbol) = input.currency_symbol {
            active.currency_symbol = Set(currency_symbol);
        }

        Ok(active.update(&*self.db).await?)
    }
}

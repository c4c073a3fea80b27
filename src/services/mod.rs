pub mod accounts;
pub mod carts;
pub mod countries;
pub mod enquiries;
pub mod listings;
pub mod payments;

use crate::{
    auth::AuthService, config::AppConfig, events::EventSender, gateway::PaymentGateway,
    notifications::Mailer,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub use accounts::AccountsService;
pub use carts::CartService;
pub use countries::CountryService;
pub use enquiries::EnquiryService;
pub use listings::ListingService;
pub use payments::PaymentService;

/// Aggregate of the services the HTTP handlers use.
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountsService>,
    pub listings: Arc<ListingService>,
    pub enquiries: Arc<EnquiryService>,
    pub carts: Arc<CartService>,
    pub payments: Arc<PaymentService>,
    pub countries: Arc<CountryService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
        config: &AppConfig,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountsService::new(
                db.clone(),
                auth.clone(),
                mailer.clone(),
                event_sender.clone(),
            )),
            listings: Arc::new(ListingService::new(db.clone(), event_sender.clone())),
            enquiries: Arc::new(EnquiryService::new(
                db.clone(),
                mailer,
                event_sender.clone(),
            )),
            carts: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            payments: Arc::new(PaymentService::new(
                db.clone(),
                gateway,
                event_sender,
                config.gateway.callback_url.clone(),
            )),
            countries: Arc::new(CountryService::new(db)),
            auth,
        }
    }
}

use crate::{
    auth::AuthUser,
    entities::{enquiry, listing, Enquiry, EnquiryModel, Listing, ListingModel, Role, User},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{EmailMessage, Mailer},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Enquiry with its listing joined in.
#[derive(Debug, Serialize)]
pub struct EnquiryWithListing {
    pub enquiry: EnquiryModel,
    pub listing: ListingModel,
}

/// Buyer/renter enquiries and agent replies. Notification emails are
/// fire-and-forget: a failed send is logged and the request still succeeds.
#[derive(Clone)]
pub struct EnquiryService {
    db: Arc<DatabaseConnection>,
    mailer: Arc<dyn Mailer>,
    event_sender: Arc<EventSender>,
}

impl EnquiryService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        mailer: Arc<dyn Mailer>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            mailer,
            event_sender,
        }
    }

    /// Records an enquiry on an active, published listing and notifies the
    /// listing's agent.
    #[instrument(skip(self, caller, message), fields(user_id = %caller.user_id))]
    pub async fn make_enquiry(
        &self,
        caller: &AuthUser,
        listing_id: Uuid,
        message: String,
    ) -> Result<EnquiryModel, ServiceError> {
        caller.require_role(Role::RenterBuyer, "make enquiries")?;

        let found = Listing::find_by_id(listing_id)
            .one(&*self.db)
            .await?
            .filter(|l| l.is_purchasable())
            .ok_or_else(|| ServiceError::NotFound("Listing not found".to_string()))?;

        let row = enquiry::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(caller.user_id),
            listing_id: Set(found.id),
            message: Set(message.clone()),
            reply: Set(None),
            created_at: Set(Utc::now()),
            replied_at: Set(None),
        };
        let created = row.insert(&*self.db).await?;

        self.notify_agent(&found, caller, &message).await;

        self.event_sender
            .send_or_log(Event::EnquiryCreated {
                enquiry_id: created.id,
                listing_id: found.id,
            })
            .await;

        Ok(created)
    }

    /// Records the agent's reply and notifies the enquirer.
    #[instrument(skip(self, caller, reply), fields(user_id = %caller.user_id))]
    pub async fn reply(
        &self,
        caller: &AuthUser,
        enquiry_id: Uuid,
        reply: String,
    ) -> Result<EnquiryModel, ServiceError> {
        caller.require_role(Role::Agent, "reply to enquiries")?;

        let found = Enquiry::find_by_id(enquiry_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Enquiry not found".to_string()))?;

        let enquired_listing = Listing::find_by_id(found.listing_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Listing not found".to_string()))?;

        if enquired_listing.agent_id != caller.user_id {
            return Err(ServiceError::Forbidden(
                "You are not authorized to reply to this enquiry".to_string(),
            ));
        }

        let enquirer_id = found.user_id;
        let mut active: enquiry::ActiveModel = found.into();
        active.reply = Set(Some(reply.clone()));
        active.replied_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        self.notify_enquirer(enquirer_id, &enquired_listing, &reply)
            .await;

        self.event_sender
            .send_or_log(Event::EnquiryReplied(updated.id))
            .await;

        Ok(updated)
    }

    /// Enquiries on the calling agent's listings, newest first.
    pub async fn received(
        &self,
        caller: &AuthUser,
    ) -> Result<Vec<EnquiryWithListing>, ServiceError> {
        caller.require_role(Role::Agent, "view enquiries")?;

        let rows = Enquiry::find()
            .find_also_related(Listing)
            .filter(listing::Column::AgentId.eq(caller.user_id))
            .order_by_desc(enquiry::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(collect_with_listing(rows))
    }

    /// The caller's own enquiries, newest first.
    pub async fn sent(&self, caller: &AuthUser) -> Result<Vec<EnquiryWithListing>, ServiceError> {
        caller.require_role(Role::RenterBuyer, "view their enquiries")?;

        let rows = Enquiry::find()
            .find_also_related(Listing)
            .filter(enquiry::Column::UserId.eq(caller.user_id))
            .order_by_desc(enquiry::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(collect_with_listing(rows))
    }

    async fn notify_agent(&self, about: &ListingModel, enquirer: &AuthUser, message: &str) {
        let agent = match User::find_by_id(about.agent_id).one(&*self.db).await {
            Ok(Some(agent)) => agent,
            Ok(None) => {
                warn!(listing_id = %about.id, "listing agent not found; skipping email");
                return;
            }
            Err(e) => {
                warn!(error = %e, "failed to load agent for enquiry email");
                return;
            }
        };

        let email = EmailMessage {
            to: agent.email.clone(),
            subject: format!("New enquiry on {}", about.title),
            body: format!(
                "Hi {},\n\nYou have received a new enquiry from {} regarding your listing '{}'.\n\n\
                 Message:\n{}\n\nPlease log in to your dashboard to reply.\n\n\
                 Best regards,\nRealty Team",
                agent.first_name, enquirer.email, about.title, message
            ),
        };

        if let Err(e) = self.mailer.send(email).await {
            warn!(error = %e, "enquiry notification email failed");
        }
    }

    async fn notify_enquirer(&self, enquirer_id: Uuid, about: &ListingModel, reply: &str) {
        let enquirer = match User::find_by_id(enquirer_id).one(&*self.db).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "failed to load enquirer for reply email");
                return;
            }
        };

        let email = EmailMessage {
            to: enquirer.email.clone(),
            subject: format!("Reply to your enquiry on {}", about.title),
            body: format!(
                "Hello {},\n\nYou received a reply to your enquiry on '{}':\n\n{}\n\n\
                 Best regards,\nRealty Team",
                enquirer.full_name(),
                about.title,
                reply
            ),
        };

        if let Err(e) = self.mailer.send(email).await {
            warn!(error = %e, "enquiry reply email failed");
        }
    }
}

fn collect_with_listing(
    rows: Vec<(EnquiryModel, Option<ListingModel>)>,
) -> Vec<EnquiryWithListing> {
    rows.into_iter()
        .filter_map(|(enquiry, maybe_listing)| {
            maybe_listing.map(|found| EnquiryWithListing {
                enquiry,
                listing: found,
            })
        })
        .collect()
}

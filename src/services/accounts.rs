use crate::{
    auth::{AuthService, AuthUser, TokenPair},
    entities::{
        email_verification_token, password_reset_otp, profile, user, Country, CountryModel,
        EmailVerificationToken, PasswordResetOtp, Profile, ProfileModel, Role, User, UserModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{EmailMessage, Mailer},
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const VERIFICATION_TOKEN_LEN: usize = 6;
const VERIFICATION_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Registration fields, validated at the handler boundary.
#[derive(Debug)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub country_id: Option<Uuid>,
}

/// Partial profile update. Only contact details are editable; names and
/// role are fixed once the account exists.
#[derive(Debug, Default)]
pub struct UpdateProfileInput {
    pub phone: Option<String>,
    pub country_id: Option<Uuid>,
}

/// Profile response: account, profile and resolved country.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user: UserModel,
    pub profile: ProfileModel,
    pub country: Option<CountryModel>,
}

/// Registration, email verification, login and password management.
#[derive(Clone)]
pub struct AccountsService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    mailer: Arc<dyn Mailer>,
    event_sender: Arc<EventSender>,
}

impl AccountsService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn Mailer>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            auth,
            mailer,
            event_sender,
        }
    }

    /// Creates the account and profile and emails the verification code.
    /// The registration email is the one send that is allowed to fail the
    /// request.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserModel, ServiceError> {
        let email = input.email.trim().to_lowercase();

        let taken = User::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?
            .is_some();
        if taken {
            return Err(ServiceError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = self.auth.hash_password(&input.password)?;

        let new_user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            is_staff: Set(false),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        };
        let created = new_user.insert(&*self.db).await?;

        let new_profile = profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(created.id),
            role: Set(input.role),
            phone: Set(input.phone),
            country_id: Set(input.country_id),
            is_email_verified: Set(false),
            created_at: Set(Utc::now()),
        };
        new_profile.insert(&*self.db).await?;

        let token = self.rotate_verification_token(created.id).await?;

        self.mailer
            .send(EmailMessage {
                to: created.email.clone(),
                subject: "Verify your email".to_string(),
                body: format!(
                    "Hello {},\n\nYour verification code is: {}\n\n\
                     This code expires in 15 minutes.",
                    created.first_name, token
                ),
            })
            .await?;

        self.event_sender
            .send_or_log(Event::UserRegistered(created.id))
            .await;

        info!("Registered user {}", created.id);
        Ok(created)
    }

    /// Confirms the emailed code and marks the profile verified.
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, email: &str, token: &str) -> Result<(), ServiceError> {
        let account = self.user_by_email(email).await?;

        let stored = EmailVerificationToken::find()
            .filter(email_verification_token::Column::UserId.eq(account.id))
            .one(&*self.db)
            .await?
            .filter(|row| row.token == token)
            .ok_or_else(|| ServiceError::ValidationError("Invalid token".to_string()))?;

        if stored.is_expired() {
            return Err(ServiceError::ValidationError("Token expired".to_string()));
        }

        let found = self.profile_of(account.id).await?;
        let mut active: profile::ActiveModel = found.into();
        active.is_email_verified = Set(true);
        active.update(&*self.db).await?;

        stored.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::EmailVerified(account.id))
            .await;

        Ok(())
    }

    /// Rotates the verification code and resends it. A send failure is
    /// logged, not returned.
    pub async fn resend_verification(&self, email: &str) -> Result<bool, ServiceError> {
        let account = self.user_by_email(email).await?;
        let found = self.profile_of(account.id).await?;

        if found.is_email_verified {
            return Ok(false);
        }

        let token = self.rotate_verification_token(account.id).await?;

        let message = EmailMessage {
            to: account.email.clone(),
            subject: "Verify your email".to_string(),
            body: format!(
                "Hello {},\n\nUse the code below to verify your email address:\n\n\
                 Verification code: {}\n\nThis code will expire in 15 minutes. \
                 If you did not request this, please ignore this email.",
                account.first_name, token
            ),
        };
        if let Err(e) = self.mailer.send(message).await {
            warn!(error = %e, "verification email failed");
        }

        Ok(true)
    }

    /// Verifies credentials, rejects unverified emails, returns tokens.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ServiceError> {
        let account = User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".to_string()))?;

        if !self
            .auth
            .verify_password(&account.password_hash, password)?
        {
            return Err(ServiceError::Unauthorized(
                "Invalid credentials".to_string(),
            ));
        }

        let found = self.profile_of(account.id).await?;
        if !found.is_email_verified {
            return Err(ServiceError::Unauthorized(
                "Email not verified".to_string(),
            ));
        }

        self.auth.issue_token_pair(&account, Some(found.role)).await
    }

    /// Issues a reset OTP when the account exists. Callers always get the
    /// same neutral answer, so nothing here may fail in a way that reveals
    /// whether the address is registered.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let Some(account) = User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?
        else {
            return Ok(());
        };

        let otp = generate_otp();
        let row = password_reset_otp::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(account.id),
            otp: Set(otp.clone()),
            is_verified: Set(false),
            created_at: Set(Utc::now()),
        };
        row.insert(&*self.db).await?;

        let message = EmailMessage {
            to: account.email.clone(),
            subject: "Your password reset code".to_string(),
            body: format!(
                "Your reset code is {}. It expires in 10 minutes.",
                otp
            ),
        };
        if let Err(e) = self.mailer.send(message).await {
            warn!(error = %e, "password reset email failed");
        }

        Ok(())
    }

    /// Marks the latest matching, unexpired OTP verified.
    pub async fn verify_reset_otp(&self, email: &str, otp: &str) -> Result<(), ServiceError> {
        let account = User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::ValidationError("Invalid credentials".to_string()))?;

        let stored = PasswordResetOtp::find()
            .filter(password_reset_otp::Column::UserId.eq(account.id))
            .filter(password_reset_otp::Column::Otp.eq(otp))
            .filter(password_reset_otp::Column::IsVerified.eq(false))
            .order_by_desc(password_reset_otp::Column::CreatedAt)
            .one(&*self.db)
            .await?
            .filter(|row| !row.is_expired())
            .ok_or_else(|| {
                ServiceError::ValidationError("Invalid or expired OTP".to_string())
            })?;

        let mut active: password_reset_otp::ActiveModel = stored.into();
        active.is_verified = Set(true);
        active.update(&*self.db).await?;

        Ok(())
    }

    /// Resets the password after a verified OTP; the OTP is consumed.
    #[instrument(skip(self, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let account = self.user_by_email(email).await?;

        let stored = PasswordResetOtp::find()
            .filter(password_reset_otp::Column::UserId.eq(account.id))
            .filter(password_reset_otp::Column::IsVerified.eq(true))
            .order_by_desc(password_reset_otp::Column::CreatedAt)
            .one(&*self.db)
            .await?
            .filter(|row| !row.is_expired())
            .ok_or_else(|| {
                ServiceError::ValidationError("OTP not verified or expired".to_string())
            })?;

        let password_hash = self.auth.hash_password(new_password)?;
        let mut active: user::ActiveModel = account.clone().into();
        active.password_hash = Set(password_hash);
        active.update(&*self.db).await?;

        stored.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PasswordReset(account.id))
            .await;

        Ok(())
    }

    /// Changes the password of an authenticated caller.
    pub async fn change_password(
        &self,
        caller: &AuthUser,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let account = User::find_by_id(caller.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let password_hash = self.auth.hash_password(new_password)?;
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(password_hash);
        active.update(&*self.db).await?;

        Ok(())
    }

    pub async fn get_profile(&self, caller: &AuthUser) -> Result<ProfileView, ServiceError> {
        let account = User::find_by_id(caller.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let found = self.profile_of(account.id).await?;

        let country = match found.country_id {
            Some(country_id) => Country::find_by_id(country_id).one(&*self.db).await?,
            None => None,
        };

        Ok(ProfileView {
            user: account,
            profile: found,
            country,
        })
    }

    pub async fn update_profile(
        &self,
        caller: &AuthUser,
        input: UpdateProfileInput,
    ) -> Result<ProfileView, ServiceError> {
        let found = self.profile_of(caller.user_id).await?;
        let mut active: profile::ActiveModel = found.into();
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(country_id) = input.country_id {
            active.country_id = Set(Some(country_id));
        }
        active.update(&*self.db).await?;

        self.get_profile(caller).await
    }

    async fn user_by_email(&self, email: &str) -> Result<UserModel, ServiceError> {
        User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    async fn profile_of(&self, user_id: Uuid) -> Result<ProfileModel, ServiceError> {
        Profile::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Profile not found".to_string()))
    }

    /// Upserts the per-user verification token with a fresh code.
    async fn rotate_verification_token(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let token = generate_verification_token();

        match EmailVerificationToken::find()
            .filter(email_verification_token::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        {
            Some(existing) => {
                let mut active: email_verification_token::ActiveModel = existing.into();
                active.token = Set(token.clone());
                active.created_at = Set(Utc::now());
                active.update(&*self.db).await?;
            }
            None => {
                let row = email_verification_token::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    token: Set(token.clone()),
                    created_at: Set(Utc::now()),
                };
                row.insert(&*self.db).await?;
            }
        }

        Ok(token)
    }
}

fn generate_verification_token() -> String {
    let mut rng = rand::thread_rng();
    (0..VERIFICATION_TOKEN_LEN)
        .map(|_| VERIFICATION_CHARSET[rng.gen_range(0..VERIFICATION_CHARSET.len())] as char)
        .collect()
}

fn generate_otp() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_token_shape() {
        let token = generate_verification_token();
        assert_eq!(token.len(), VERIFICATION_TOKEN_LEN);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }
}

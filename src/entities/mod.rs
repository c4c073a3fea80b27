pub mod cart;
pub mod cart_item;
pub mod country;
pub mod email_verification_token;
pub mod enquiry;
pub mod listing;
pub mod password_reset_otp;
pub mod payment;
pub mod profile;
pub mod refresh_token;
pub mod user;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use country::{Entity as Country, Model as CountryModel};
pub use email_verification_token::{
    Entity as EmailVerificationToken, Model as EmailVerificationTokenModel,
};
pub use enquiry::{Entity as Enquiry, Model as EnquiryModel};
pub use listing::{Entity as Listing, ListingKind, Model as ListingModel};
pub use password_reset_otp::{Entity as PasswordResetOtp, Model as PasswordResetOtpModel};
pub use payment::{Entity as Payment, Model as PaymentModel};
pub use profile::{Entity as Profile, Model as ProfileModel, Role};
pub use refresh_token::{Entity as RefreshToken, Model as RefreshTokenModel};
pub use user::{Entity as User, Model as UserModel};

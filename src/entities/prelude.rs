pub use super::beta_feedback::Entity as BetaFeedback;
pub use super::referral_codes::Entity as ReferralCodes;
pub use super::request_status_events::Entity as RequestStatusEvents;
pub use super::requests::Entity as Requests;
pub use super::users::Entity as Users;

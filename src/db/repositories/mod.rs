pub mod feedback;
pub mod referral;
pub mod request;
pub mod user;

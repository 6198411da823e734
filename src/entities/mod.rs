pub mod prelude;

pub mod beta_feedback;
pub mod referral_codes;
pub mod request_status_events;
pub mod requests;
pub mod users;

pub mod access_key;
pub use access_key::{AlphanumericKeyGenerator, KeyGenerator};

pub mod token;
pub use token::{IssuedToken, TokenError, TokenService};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, UserInfo, authorize};
pub use auth_service_impl::SeaOrmAuthService;

pub mod referral_service;
pub mod referral_service_impl;
pub use referral_service::{CreateReferral, ReferralError, ReferralService, ReferralSummary};
pub use referral_service_impl::SeaOrmReferralService;

pub mod request_service;
pub mod request_service_impl;
pub use request_service::{
    PublicRequestView, RequestError, RequestReceipt, RequestService, RequestSubmission,
    RequestView, StatusChange, StatusChangeResult, StatusEventView,
};
pub use request_service_impl::SeaOrmRequestService;

pub mod feedback_service;
pub mod feedback_service_impl;
pub use feedback_service::{FeedbackError, FeedbackService};
pub use feedback_service_impl::SeaOrmFeedbackService;

pub mod system_service;
pub mod system_service_impl;
pub use system_service::{DeskStats, SystemError, SystemService};
pub use system_service_impl::SeaOrmSystemService;

mod admin;
mod config;
mod referral;

pub use admin::{cmd_create_admin, cmd_list_users};
pub use config::cmd_init_config;
pub use referral::{cmd_referral_create, cmd_referral_delete, cmd_referral_list};

//! Referral code admission rules.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// The limits a referral code imposes on signups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralRule {
    /// Maximum number of accounts that may be created with the code.
    pub usage_limit: Option<u64>,
    /// Last instant at which the code is still accepted.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Why a referral code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralDenial {
    NotFound,
    Expired,
    LimitReached,
}

impl fmt::Display for ReferralDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "Referral code does not exist",
            Self::Expired => "Referral code has expired",
            Self::LimitReached => "Referral code has reached its usage limit",
        })
    }
}

/// Decides whether one more account may use a code.
///
/// `rule` is `None` when no code with that string exists. A code is
/// admissible iff it exists, `now <= expires_at` (when set) and
/// `usage_count < usage_limit` (when set).
///
/// # Errors
///
/// Returns the first failing condition in the order not-found, expired,
/// limit reached.
pub fn check_admission(
    rule: Option<&ReferralRule>,
    usage_count: u64,
    now: DateTime<Utc>,
) -> Result<(), ReferralDenial> {
    let rule = rule.ok_or(ReferralDenial::NotFound)?;

    if let Some(expires_at) = rule.expires_at
        && now > expires_at
    {
        return Err(ReferralDenial::Expired);
    }

    if let Some(limit) = rule.usage_limit
        && usage_count >= limit
    {
        return Err(ReferralDenial::LimitReached);
    }

    Ok(())
}

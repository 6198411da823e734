//! Commission request status and the rules for moving between statuses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownVariant;

/// Fulfillment pipeline status of a request.
///
/// The main line is `Pending -> Reviewing -> Approved -> Production ->
/// Shipping -> Completed`; `OnHold` and `Rejected` are side states.
/// `Completed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Reviewing,
    Approved,
    Production,
    Shipping,
    Completed,
    OnHold,
    Rejected,
}

impl RequestStatus {
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::Reviewing,
        Self::Approved,
        Self::Production,
        Self::Shipping,
        Self::Completed,
        Self::OnHold,
        Self::Rejected,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewing => "reviewing",
            Self::Approved => "approved",
            Self::Production => "production",
            Self::Shipping => "shipping",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Next status on the main line, if any.
    #[must_use]
    pub const fn successor(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Reviewing),
            Self::Reviewing => Some(Self::Approved),
            Self::Approved => Some(Self::Production),
            Self::Production => Some(Self::Shipping),
            Self::Shipping => Some(Self::Completed),
            Self::Completed | Self::OnHold | Self::Rejected => None,
        }
    }

    /// Statuses reachable in one step when transitions are enforced.
    #[must_use]
    pub fn forward_targets(&self) -> Vec<Self> {
        match self {
            Self::Completed | Self::Rejected => Vec::new(),
            Self::OnHold => Self::ALL
                .into_iter()
                .filter(|s| !matches!(s, Self::OnHold | Self::Completed))
                .collect(),
            main_line => {
                let mut targets: Vec<Self> = main_line.successor().into_iter().collect();
                targets.extend([Self::OnHold, Self::Rejected]);
                targets
            }
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Which status changes the workflow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any declared status may follow any other.
    #[default]
    Permissive,
    /// Only main-line steps, side states and resuming from hold; nothing
    /// leaves a terminal status.
    Strict,
}

impl TransitionPolicy {
    #[must_use]
    pub const fn from_enforced(enforce: bool) -> Self {
        if enforce { Self::Strict } else { Self::Permissive }
    }

    #[must_use]
    pub fn allows(&self, from: RequestStatus, to: RequestStatus) -> bool {
        match self {
            Self::Permissive => true,
            Self::Strict => from == to || from.forward_targets().contains(&to),
        }
    }
}

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::service::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }

    /// Localized label shared by the admin card and the user notice.
    pub fn label(&self) -> String {
        match self {
            RequestStatus::Pending => t!("status.pending").to_string(),
            RequestStatus::Approved => t!("status.approved").to_string(),
            RequestStatus::Rejected => t!("status.rejected").to_string(),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(RequestStatus::Pending),
            "Approved" => Ok(RequestStatus::Approved),
            "Rejected" => Ok(RequestStatus::Rejected),
            _ => Err(format!("Unknown request status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// Digits-only amount as the user typed it. Kept as text so any magnitude is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(String);

impl Amount {
    pub fn parse(input: &str) -> Option<Self> {
        if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(input.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value for aggregation, saturating at `u128::MAX`.
    pub fn value(&self) -> u128 {
        self.0.parse::<u128>().unwrap_or(u128::MAX)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub user_id: i64,
    pub currency: String,
    pub amount: Amount,
    pub comment: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: i64,
    pub user_id: i64,
    pub request_number: i64,
    pub currency: String,
    pub amount: Amount,
    pub comment: String,
    pub file_path: Option<String>,
    pub status: RequestStatus,
    pub admin_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A request joined with its owner's registration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDetails {
    pub request: Request,
    pub owner: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    pub request_id: i64,
    pub request_number: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub total: u64,
    pub approved: u64,
    pub rejected: u64,
    pub totals_by_currency: BTreeMap<String, u128>,
}

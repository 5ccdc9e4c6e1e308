use std::{fmt, str::FromStr};

use crate::service::request::{Amount, Decision};

/// Telegram rejects callback data longer than this.
const MAX_CALLBACK_DATA: usize = 64;

/// Every button payload the bot emits or still accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Register,
    MakeRequest,
    MyRequests,
    Currency(String),
    SkipFile,
    Decide { request_id: i64, decision: Decision },
    ApproveWithComment { request_id: i64 },
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown callback data: {0}")]
pub struct UnknownCallback(pub String);

impl CallbackAction {
    /// Skip button for the attachment step, carrying the collected fields when they fit.
    pub fn skip_file_payload(currency: &str, amount: &Amount, comment: &str) -> String {
        let full = format!("skip_file|{}|{}|{}", currency, amount, comment);
        if full.len() <= MAX_CALLBACK_DATA && !comment.contains('|') {
            full
        } else {
            "skip_file".to_string()
        }
    }
}

fn trailing_id(data: &str) -> Result<i64, UnknownCallback> {
    data.rsplit('_')
        .next()
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| UnknownCallback(data.to_string()))
}

impl FromStr for CallbackAction {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data {
            "register" => Ok(Self::Register),
            "make_request" => Ok(Self::MakeRequest),
            "my_requests" => Ok(Self::MyRequests),
            "skip_file" => Ok(Self::SkipFile),
            s if s.starts_with("skip_file|") => Ok(Self::SkipFile),
            s if s.starts_with("currency_") && s.len() > "currency_".len() => {
                Ok(Self::Currency(s["currency_".len()..].to_string()))
            }
            s if s.starts_with("approve_with_comment_") => Ok(Self::ApproveWithComment {
                request_id: trailing_id(s)?,
            }),
            s if s.starts_with("approve_") => Ok(Self::Decide {
                request_id: trailing_id(s)?,
                decision: Decision::Approve,
            }),
            s if s.starts_with("reject_") => Ok(Self::Decide {
                request_id: trailing_id(s)?,
                decision: Decision::Reject,
            }),
            _ => Err(UnknownCallback(data.to_string())),
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => write!(f, "register"),
            Self::MakeRequest => write!(f, "make_request"),
            Self::MyRequests => write!(f, "my_requests"),
            Self::Currency(code) => write!(f, "currency_{}", code),
            Self::SkipFile => write!(f, "skip_file"),
            Self::Decide {
                request_id,
                decision: Decision::Approve,
            } => write!(f, "approve_{}", request_id),
            Self::Decide {
                request_id,
                decision: Decision::Reject,
            } => write!(f, "reject_{}", request_id),
            Self::ApproveWithComment { request_id } => write!(f, "approve_with_comment_{}", request_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> CallbackAction {
        data.parse().unwrap()
    }

    #[test]
    fn test_parse_menu_payloads() {
        assert_eq!(parse("register"), CallbackAction::Register);
        assert_eq!(parse("make_request"), CallbackAction::MakeRequest);
        assert_eq!(parse("my_requests"), CallbackAction::MyRequests);
        assert_eq!(parse("currency_USD"), CallbackAction::Currency("USD".to_string()));
        assert!("currency_".parse::<CallbackAction>().is_err());
    }

    #[test]
    fn test_parse_decisions_by_trailing_id() {
        assert_eq!(
            parse("approve_17"),
            CallbackAction::Decide {
                request_id: 17,
                decision: Decision::Approve
            }
        );
        assert_eq!(
            parse("approve_without_comment_17"),
            CallbackAction::Decide {
                request_id: 17,
                decision: Decision::Approve
            }
        );
        assert_eq!(
            parse("approve_with_comment_17"),
            CallbackAction::ApproveWithComment { request_id: 17 }
        );
        assert_eq!(
            parse("reject_3"),
            CallbackAction::Decide {
                request_id: 3,
                decision: Decision::Reject
            }
        );
        assert!("reject_x".parse::<CallbackAction>().is_err());
        assert!("unknown".parse::<CallbackAction>().is_err());
    }

    #[test]
    fn test_emitted_payloads() {
        let approve = CallbackAction::Decide {
            request_id: 9,
            decision: Decision::Approve,
        };
        assert_eq!(approve.to_string(), "approve_9");
        assert_eq!(
            CallbackAction::ApproveWithComment { request_id: 9 }.to_string(),
            "approve_with_comment_9"
        );
        assert_eq!(CallbackAction::Currency("EUR".to_string()).to_string(), "currency_EUR");
    }

    #[test]
    fn test_skip_payload() {
        let amount = Amount::parse("250").unwrap();
        let payload = CallbackAction::skip_file_payload("USD", &amount, "taxi");
        assert_eq!(payload, "skip_file|USD|250|taxi");
        assert_eq!(parse(&payload), CallbackAction::SkipFile);

        let piped = CallbackAction::skip_file_payload("USD", &amount, "a|b");
        assert_eq!(piped, "skip_file");

        let long = CallbackAction::skip_file_payload("USD", &amount, &"x".repeat(80));
        assert_eq!(long, "skip_file");
    }
}

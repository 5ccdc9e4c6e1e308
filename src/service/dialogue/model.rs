use crate::{
    service::request::Amount,
    transport::{IncomingFile, MessageRef},
};

/// The single step each user's conversation is waiting on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    Idle,
    // Registration
    AwaitingName,
    AwaitingPhone {
        name: String,
    },
    AwaitingCity {
        name: String,
        phone: String,
    },
    // Request
    AwaitingCurrency,
    AwaitingAmount {
        currency: String,
    },
    AwaitingComment {
        currency: String,
        amount: Amount,
    },
    AwaitingAttachment {
        currency: String,
        amount: Amount,
        comment: String,
    },
    // Admin review
    AwaitingApprovalComment {
        request_id: i64,
        card: MessageRef,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Currency(String),
    File(IncomingFile),
    /// Media the bot does not handle, such as stickers or voice notes.
    Other,
    SkipAttachment,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    Phone,
    City,
    Amount,
    Comment,
    Attachment {
        currency: String,
        amount: Amount,
        comment: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    ExpectedText,
    InvalidAmount,
    UnsupportedFile,
    ExpectedAttachment,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub phone: String,
    pub city: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub currency: String,
    pub amount: Amount,
    pub comment: String,
    pub attachment: Option<IncomingFile>,
}

/// What the caller has to do after a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Ask(Prompt),
    /// The same step is pending again.
    Retry(Rejection),
    Register(RegistrationForm),
    Submit(Submission),
    ApproveWithComment {
        request_id: i64,
        card: MessageRef,
        comment: String,
    },
    /// Nothing pending accepts this input; the state is unchanged.
    Unexpected,
}

impl DialogueState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogueState::Idle)
    }

    pub fn advance(self, input: Input) -> (DialogueState, Transition) {
        use DialogueState::*;

        match (self, input) {
            (AwaitingName, Input::Text(name)) => (AwaitingPhone { name }, Transition::Ask(Prompt::Phone)),
            (AwaitingPhone { name }, Input::Text(phone)) => {
                (AwaitingCity { name, phone }, Transition::Ask(Prompt::City))
            }
            (AwaitingCity { name, phone }, Input::Text(city)) => {
                (Idle, Transition::Register(RegistrationForm { name, phone, city }))
            }
            (state @ (AwaitingName | AwaitingPhone { .. } | AwaitingCity { .. }), Input::File(_) | Input::Other) => {
                (state, Transition::Retry(Rejection::ExpectedText))
            }

            (AwaitingCurrency, Input::Currency(currency) | Input::Text(currency)) => (
                AwaitingAmount {
                    currency: currency.trim().to_string(),
                },
                Transition::Ask(Prompt::Amount),
            ),

            (AwaitingAmount { currency }, Input::Text(text)) => match Amount::parse(&text) {
                Some(amount) => (AwaitingComment { currency, amount }, Transition::Ask(Prompt::Comment)),
                None => (AwaitingAmount { currency }, Transition::Retry(Rejection::InvalidAmount)),
            },
            (state @ AwaitingAmount { .. }, Input::File(_) | Input::Other) => {
                (state, Transition::Retry(Rejection::InvalidAmount))
            }

            (AwaitingComment { currency, amount }, Input::Text(comment)) => (
                AwaitingAttachment {
                    currency: currency.clone(),
                    amount: amount.clone(),
                    comment: comment.clone(),
                },
                Transition::Ask(Prompt::Attachment {
                    currency,
                    amount,
                    comment,
                }),
            ),
            (state @ AwaitingComment { .. }, Input::File(_) | Input::Other) => {
                (state, Transition::Retry(Rejection::ExpectedText))
            }

            (
                AwaitingAttachment {
                    currency,
                    amount,
                    comment,
                },
                Input::File(file),
            ) => {
                if file.is_supported() {
                    (
                        Idle,
                        Transition::Submit(Submission {
                            currency,
                            amount,
                            comment,
                            attachment: Some(file),
                        }),
                    )
                } else {
                    (
                        AwaitingAttachment {
                            currency,
                            amount,
                            comment,
                        },
                        Transition::Retry(Rejection::UnsupportedFile),
                    )
                }
            }
            (
                AwaitingAttachment {
                    currency,
                    amount,
                    comment,
                },
                Input::SkipAttachment,
            ) => (
                Idle,
                Transition::Submit(Submission {
                    currency,
                    amount,
                    comment,
                    attachment: None,
                }),
            ),
            (state @ AwaitingAttachment { .. }, Input::Text(_) | Input::Other) => {
                (state, Transition::Retry(Rejection::ExpectedAttachment))
            }

            (AwaitingApprovalComment { request_id, card }, Input::Text(comment)) => (
                Idle,
                Transition::ApproveWithComment {
                    request_id,
                    card,
                    comment,
                },
            ),
            (state @ AwaitingApprovalComment { .. }, Input::File(_) | Input::Other) => {
                (state, Transition::Retry(Rejection::ExpectedText))
            }

            (state, _) => (state, Transition::Unexpected),
        }
    }
}

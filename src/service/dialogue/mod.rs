use std::sync::Arc;

use dashmap::DashMap;

pub mod model;

pub use model::*;

/// In-memory conversation state, one entry per user.
#[derive(Clone, Default)]
pub struct DialogueService {
    states: Arc<DashMap<i64, DialogueState>>,
}

impl DialogueService {
    pub fn new() -> Self {
        info!("Initializing DialogueService...");
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, user_id: i64) -> DialogueState {
        self.states
            .get(&user_id)
            .map(|state| state.value().clone())
            .unwrap_or_default()
    }

    /// Enters `state`, discarding whatever the user was doing before.
    pub fn start(&self, user_id: i64, state: DialogueState) {
        if state.is_idle() {
            self.states.remove(&user_id);
        } else {
            self.states.insert(user_id, state);
        }
    }

    pub fn reset(&self, user_id: i64) {
        if self.states.remove(&user_id).is_some() {
            debug!("Dialogue of user {} reset", user_id);
        }
    }

    /// Applies one input under the user's entry lock.
    pub fn advance(&self, user_id: i64, input: Input) -> Transition {
        let mut entry = self.states.entry(user_id).or_default();
        let current = std::mem::take(entry.value_mut());
        let (next, transition) = current.advance(input);
        let idle = next.is_idle();
        *entry.value_mut() = next;
        drop(entry);

        if idle {
            self.states.remove_if(&user_id, |_, state| state.is_idle());
        }

        transition
    }

    /// Puts a consumed state back, for when acting on its transition failed.
    pub fn restore(&self, user_id: i64, state: DialogueState) {
        self.start(user_id, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_progress_independently() {
        let dialogues = DialogueService::new();
        dialogues.start(1, DialogueState::AwaitingName);
        dialogues.start(2, DialogueState::AwaitingCurrency);

        dialogues.advance(1, Input::Text("Ivan".to_string()));

        assert_eq!(
            dialogues.get(1),
            DialogueState::AwaitingPhone {
                name: "Ivan".to_string()
            }
        );
        assert_eq!(dialogues.get(2), DialogueState::AwaitingCurrency);
        assert_eq!(dialogues.get(3), DialogueState::Idle);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let dialogues = DialogueService::new();
        dialogues.start(1, DialogueState::AwaitingCurrency);
        dialogues.reset(1);

        let transition = dialogues.advance(1, Input::Currency("USD".to_string()));
        assert_eq!(transition, Transition::Unexpected);
        assert!(dialogues.get(1).is_idle());
    }

    #[test]
    fn test_finished_dialogue_is_dropped() {
        let dialogues = DialogueService::new();
        dialogues.start(1, DialogueState::AwaitingCity {
            name: "Ivan".to_string(),
            phone: "+380501234567".to_string(),
        });

        let transition = dialogues.advance(1, Input::Text("Lviv".to_string()));

        assert!(matches!(transition, Transition::Register(_)));
        assert!(dialogues.states.is_empty());
    }

    #[test]
    fn test_unexpected_skip_creates_no_state() {
        let dialogues = DialogueService::new();
        let transition = dialogues.advance(5, Input::SkipAttachment);
        assert_eq!(transition, Transition::Unexpected);
        assert!(dialogues.states.is_empty());
    }
}

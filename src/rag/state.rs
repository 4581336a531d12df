//! Per-request state machine for the ask pipeline
//!
//! Valid transitions:
//! 1. Received  → Validated  (on: QuestionAccepted)
//! 2. Validated → Embedded   (on: QueryEmbedded)
//! 3. Embedded  → Retrieved  (on: ContextRetrieved)
//! 4. Retrieved → Ranked     (on: ContextRanked)
//! 5. Ranked    → Answered   (on: AnswerGenerated)
//! 6. \*         → Failed     (on: Fail), except from a terminal state
//!
//! `Answered` and `Failed` are terminal; any event on them is rejected.

use crate::errors::{AskError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AskState {
    Received,
    Validated,
    Embedded,
    Retrieved,
    Ranked,
    Answered,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskEvent {
    QuestionAccepted,
    QueryEmbedded,
    ContextRetrieved,
    ContextRanked,
    AnswerGenerated,
    Fail,
}

impl AskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AskState::Answered | AskState::Failed)
    }

    pub fn transition(&self, event: AskEvent) -> Result<AskState> {
        use AskEvent::*;
        use AskState::*;

        let next = match (self, event) {
            (Answered, _) | (Failed, _) => {
                return Err(self.invalid(event));
            }
            (_, Fail) => Failed,
            (Received, QuestionAccepted) => Validated,
            (Validated, QueryEmbedded) => Embedded,
            (Embedded, ContextRetrieved) => Retrieved,
            (Retrieved, ContextRanked) => Ranked,
            (Ranked, AnswerGenerated) => Answered,
            _ => return Err(self.invalid(event)),
        };

        Ok(next)
    }

    fn invalid(&self, event: AskEvent) -> AskError {
        AskError::InvalidTransition {
            from: format!("{:?}", self),
            event: format!("{:?}", event),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AskState::Received => "Received",
            AskState::Validated => "Validated",
            AskState::Embedded => "Embedded",
            AskState::Retrieved => "Retrieved",
            AskState::Ranked => "Ranked",
            AskState::Answered => "Answered",
            AskState::Failed => "Failed",
        }
    }
}

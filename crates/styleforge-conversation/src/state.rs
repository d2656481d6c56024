// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state held between events.
//!
//! Idle is represented by the *absence* of a stored state, so a non-idle
//! conversation always has an origin message by construction: every stored
//! state carries its origin reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use styleforge_core::{AccountId, MessageRef};

use crate::events::ConfigField;

/// What the conversation is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Action {
    /// A photo caption was produced; waiting for the user to accept it.
    AwaitingCaptionConfirmation,
    /// Waiting for primary style toggles and Done.
    AwaitingStyleSelection,
    /// Waiting for secondary style toggles and Confirm/Skip.
    AwaitingSecondarySelection,
    /// Waiting for a numeric value for one generation parameter.
    AwaitingNumericConfigInput(ConfigField),
}

/// One account's in-progress conversation. At most one exists per account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub account: AccountId,
    pub action: Action,
    /// Free text from the user, or an accepted machine caption.
    pub prompt: String,
    /// Selected primary style names, insertion order preserved for display.
    pub selected_styles: Vec<String>,
    /// Selected secondary style names.
    pub selected_secondary: Vec<String>,
    /// Reference to the message displaying the current step.
    pub origin: MessageRef,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Create a fresh state for the given step.
    pub fn new(account: AccountId, action: Action, prompt: String, origin: MessageRef) -> Self {
        Self {
            account,
            action,
            prompt,
            selected_styles: Vec::new(),
            selected_secondary: Vec::new(),
            origin,
            updated_at: Utc::now(),
        }
    }

    /// Combined count of selected primary and secondary styles.
    pub fn selected_count(&self) -> usize {
        self.selected_styles.len() + self.selected_secondary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_displays_its_variant_name() {
        assert_eq!(
            Action::AwaitingStyleSelection.to_string(),
            "AwaitingStyleSelection"
        );
        assert_eq!(
            Action::AwaitingNumericConfigInput(ConfigField::Steps).to_string(),
            "AwaitingNumericConfigInput"
        );
    }

    #[test]
    fn selected_count_sums_both_lists() {
        let mut state = ConversationState::new(
            AccountId(1),
            Action::AwaitingStyleSelection,
            "a fox".into(),
            MessageRef("m1".into()),
        );
        state.selected_styles.push("Watercolor".into());
        state.selected_secondary.push("Film grain".into());
        state.selected_secondary.push("Glow".into());
        assert_eq!(state.selected_count(), 3);
    }
}

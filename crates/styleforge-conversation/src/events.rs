// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound conversation events and outbound effects.
//!
//! Events arrive from the transport layer tagged with an account id and a
//! message reference; effects are consumed by the transport layer. Both
//! sides are transport-agnostic: a keyboard is a list of labeled buttons,
//! not any particular chat platform's markup.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use styleforge_core::{AccountId, MessageRef};

/// A generation parameter an account can override with a numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum ConfigField {
    Steps,
    GuidanceScale,
    ImageCount,
}

/// A parsed, range-checked parameter value ready to persist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigUpdate {
    Steps(u32),
    GuidanceScale(f64),
    ImageCount(u32),
}

/// An inbound conversational event, already decoded by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// Free-text prompt. Always qualifies as a fresh conversation start.
    Text(String),
    /// The captioning collaborator's output for a photo the user sent.
    /// Also qualifies as a fresh conversation start.
    PhotoCaptioned(String),
    /// User accepted the machine-generated caption as the prompt.
    ConfirmCaption,
    /// Toggle a primary style by catalog id.
    ToggleStyle(String),
    /// Toggle a secondary style by catalog id.
    ToggleSecondary(String),
    /// Finish primary selection, move on to secondary styles.
    Done,
    /// Skip secondary styles (clears any selected so far).
    Skip,
    /// Final confirmation: hand off to the orchestrator.
    Confirm,
    /// Abort the conversation.
    Cancel,
    /// Begin numeric entry for one generation parameter. Also qualifies as
    /// a fresh conversation start.
    Configure(ConfigField),
    /// Anything the transport could not decode.
    Unknown(String),
}

impl ConversationEvent {
    /// Whether this event may start a fresh conversation, overwriting any
    /// stale state for the account.
    pub fn is_fresh_start(&self) -> bool {
        matches!(
            self,
            ConversationEvent::Text(_)
                | ConversationEvent::PhotoCaptioned(_)
                | ConversationEvent::Configure(_)
        )
    }
}

/// A non-toggle button on a step keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum ActionButton {
    ConfirmCaption,
    Done,
    Skip,
    Confirm,
    Cancel,
}

/// One style toggle button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleButton {
    pub label: String,
    pub style_id: String,
    pub selected: bool,
}

/// Transport-agnostic inline keyboard for the current step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyboard {
    pub toggles: Vec<ToggleButton>,
    pub actions: Vec<ActionButton>,
}

/// The finalized selection handed to the orchestrator on confirm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedSelection {
    pub account: AccountId,
    pub prompt: String,
    /// Primary style names, insertion order preserved.
    pub styles: Vec<String>,
    /// Secondary style names, insertion order preserved.
    pub secondary_styles: Vec<String>,
}

/// A side effect the transport layer must perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a new message to the account.
    Prompt {
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Edit the message that displays the current step.
    Edit {
        origin: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Transient warning (limit reached, unknown style, unknown action).
    Notice(String),
    /// The conversation state expired or never existed; the transport
    /// should edit the stale message to say so.
    Expired { origin: MessageRef },
    /// Terminal hand-off: launch a generation batch.
    StartGeneration(FinalizedSelection),
    /// Persist a generation parameter override for the account.
    SaveOverride(ConfigUpdate),
}

// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine and state store for Styleforge.
//!
//! The machine in [`machine`] is a pure function from (state, event) to
//! (next state, effects); the store in [`store`] is the concurrent map the
//! caller persists those states in between events. The caller wires the
//! two together and delivers effects through the transport layer.

pub mod events;
pub mod machine;
pub mod state;
pub mod store;

pub use events::{
    ActionButton, ConfigField, ConfigUpdate, ConversationEvent, Effect, FinalizedSelection,
    Keyboard, ToggleButton,
};
pub use machine::{Transition, TransitionContext, transition};
pub use state::{Action, ConversationState};
pub use store::ConversationStore;

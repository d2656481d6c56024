// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pure conversation state machine.
//!
//! `transition` maps (current state, event) to (next state, effects) with
//! no hidden globals and no I/O: catalog visibility and selection limits
//! come in through [`TransitionContext`], storage and delivery happen in
//! the caller. Toggling is symmetric difference; the combined selection
//! cap is checked at the moment of each attempted addition.

use styleforge_catalog::Style;
use styleforge_core::{AccountId, MessageRef};
use tracing::debug;

use crate::events::{
    ActionButton, ConfigField, ConfigUpdate, ConversationEvent, Effect, FinalizedSelection,
    Keyboard, ToggleButton,
};
use crate::state::{Action, ConversationState};

/// Catalog and limit inputs to one transition, pre-resolved for the
/// event's account.
pub struct TransitionContext<'a> {
    pub account: AccountId,
    /// Primary styles visible to the account, in display order.
    pub styles: Vec<&'a Style>,
    /// Secondary styles visible to the account, in display order.
    pub secondary: Vec<&'a Style>,
    /// Maximum combined primary + secondary selections.
    pub max_selected: usize,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The state to store, or `None` to clear it (conversation is Idle).
    pub next: Option<ConversationState>,
    /// Effects for the transport layer, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn keep(state: ConversationState, effects: Vec<Effect>) -> Self {
        Self {
            next: Some(state),
            effects,
        }
    }

    fn clear(effects: Vec<Effect>) -> Self {
        Self {
            next: None,
            effects,
        }
    }
}

/// Compute the next state and effects for one inbound event.
///
/// `origin` is the message reference the transport attached to the event;
/// the stored state's origin is refreshed from it on every transition
/// (last event wins).
pub fn transition(
    ctx: &TransitionContext<'_>,
    current: Option<ConversationState>,
    event: &ConversationEvent,
    origin: &MessageRef,
) -> Transition {
    // Fresh text, caption, or configure always overwrites whatever was
    // there, except that text addressed to a numeric-input step is the
    // value being entered, not a new prompt.
    let entering_number = matches!(
        (&current, event),
        (Some(state), ConversationEvent::Text(_))
            if matches!(state.action, Action::AwaitingNumericConfigInput(_))
    );
    if event.is_fresh_start() && !entering_number {
        return start_fresh(ctx, event, origin);
    }

    let Some(mut state) = current else {
        debug!(account = %ctx.account, ?event, "event for missing or expired conversation");
        return Transition::clear(vec![Effect::Expired {
            origin: origin.clone(),
        }]);
    };

    state.origin = origin.clone();
    state.updated_at = chrono::Utc::now();

    match state.action {
        Action::AwaitingCaptionConfirmation => caption_step(ctx, state, event),
        Action::AwaitingStyleSelection => primary_step(ctx, state, event),
        Action::AwaitingSecondarySelection => secondary_step(ctx, state, event),
        Action::AwaitingNumericConfigInput(field) => numeric_step(state, field, event),
    }
}

fn start_fresh(
    ctx: &TransitionContext<'_>,
    event: &ConversationEvent,
    origin: &MessageRef,
) -> Transition {
    match event {
        ConversationEvent::Text(text) => {
            let state = ConversationState::new(
                ctx.account,
                Action::AwaitingStyleSelection,
                text.clone(),
                origin.clone(),
            );
            let keyboard = primary_keyboard(ctx, &state);
            Transition::keep(
                state,
                vec![Effect::Prompt {
                    text: select_styles_text(text),
                    keyboard: Some(keyboard),
                }],
            )
        }
        ConversationEvent::PhotoCaptioned(caption) => {
            let state = ConversationState::new(
                ctx.account,
                Action::AwaitingCaptionConfirmation,
                caption.clone(),
                origin.clone(),
            );
            Transition::keep(
                state,
                vec![Effect::Prompt {
                    text: format!("I see: \"{caption}\"\nUse this as the prompt?"),
                    keyboard: Some(Keyboard {
                        toggles: Vec::new(),
                        actions: vec![ActionButton::ConfirmCaption, ActionButton::Cancel],
                    }),
                }],
            )
        }
        ConversationEvent::Configure(field) => {
            let state = ConversationState::new(
                ctx.account,
                Action::AwaitingNumericConfigInput(*field),
                String::new(),
                origin.clone(),
            );
            Transition::keep(
                state,
                vec![Effect::Prompt {
                    text: configure_prompt_text(*field),
                    keyboard: Some(Keyboard {
                        toggles: Vec::new(),
                        actions: vec![ActionButton::Cancel],
                    }),
                }],
            )
        }
        _ => unreachable!("is_fresh_start gates this arm"),
    }
}

fn numeric_step(
    state: ConversationState,
    field: ConfigField,
    event: &ConversationEvent,
) -> Transition {
    match event {
        ConversationEvent::Text(input) => match parse_config_value(field, input) {
            Ok(update) => Transition::clear(vec![
                Effect::SaveOverride(update),
                Effect::Notice(format!("{field} set to {}.", input.trim())),
            ]),
            Err(notice) => Transition::keep(state, vec![Effect::Notice(notice)]),
        },
        ConversationEvent::Cancel => cancelled(state),
        _ => unknown_action(state, event),
    }
}

fn configure_prompt_text(field: ConfigField) -> String {
    match field {
        ConfigField::Steps => format!("Send a sampler step count ({STEPS_MIN}-{STEPS_MAX})."),
        ConfigField::GuidanceScale => {
            format!("Send a guidance scale ({GUIDANCE_MIN}-{GUIDANCE_MAX}).")
        }
        ConfigField::ImageCount => {
            format!("Send the number of images per job ({COUNT_MIN}-{COUNT_MAX}).")
        }
    }
}

const STEPS_MIN: u32 = 1;
const STEPS_MAX: u32 = 150;
const GUIDANCE_MIN: f64 = 1.0;
const GUIDANCE_MAX: f64 = 30.0;
const COUNT_MIN: u32 = 1;
const COUNT_MAX: u32 = 8;

/// Parse and range-check a numeric value for one override field. The error
/// string is a user-facing notice.
fn parse_config_value(field: ConfigField, input: &str) -> Result<ConfigUpdate, String> {
    let input = input.trim();
    match field {
        ConfigField::Steps => match input.parse::<u32>() {
            Ok(n) if (STEPS_MIN..=STEPS_MAX).contains(&n) => Ok(ConfigUpdate::Steps(n)),
            _ => Err(format!("Enter a whole number between {STEPS_MIN} and {STEPS_MAX}.")),
        },
        ConfigField::GuidanceScale => match input.parse::<f64>() {
            Ok(g) if g.is_finite() && (GUIDANCE_MIN..=GUIDANCE_MAX).contains(&g) => {
                Ok(ConfigUpdate::GuidanceScale(g))
            }
            _ => Err(format!("Enter a number between {GUIDANCE_MIN} and {GUIDANCE_MAX}.")),
        },
        ConfigField::ImageCount => match input.parse::<u32>() {
            Ok(n) if (COUNT_MIN..=COUNT_MAX).contains(&n) => Ok(ConfigUpdate::ImageCount(n)),
            _ => Err(format!("Enter a whole number between {COUNT_MIN} and {COUNT_MAX}.")),
        },
    }
}

fn caption_step(
    ctx: &TransitionContext<'_>,
    mut state: ConversationState,
    event: &ConversationEvent,
) -> Transition {
    match event {
        ConversationEvent::ConfirmCaption => {
            state.action = Action::AwaitingStyleSelection;
            let keyboard = primary_keyboard(ctx, &state);
            let text = select_styles_text(&state.prompt);
            let origin = state.origin.clone();
            Transition::keep(
                state,
                vec![Effect::Edit {
                    origin,
                    text,
                    keyboard: Some(keyboard),
                }],
            )
        }
        ConversationEvent::Cancel => cancelled(state),
        _ => unknown_action(state, event),
    }
}

fn primary_step(
    ctx: &TransitionContext<'_>,
    mut state: ConversationState,
    event: &ConversationEvent,
) -> Transition {
    match event {
        ConversationEvent::ToggleStyle(id) => {
            match toggle(&ctx.styles, &mut state, id, Selection::Primary, ctx.max_selected) {
                Some(notice) => Transition::keep(state, vec![Effect::Notice(notice)]),
                None => {
                    let keyboard = primary_keyboard(ctx, &state);
                    let text = select_styles_text(&state.prompt);
                    let origin = state.origin.clone();
                    Transition::keep(
                        state,
                        vec![Effect::Edit {
                            origin,
                            text,
                            keyboard: Some(keyboard),
                        }],
                    )
                }
            }
        }
        ConversationEvent::Done => {
            if state.selected_styles.is_empty() {
                return Transition::keep(
                    state,
                    vec![Effect::Notice("Select at least one style first.".into())],
                );
            }
            state.action = Action::AwaitingSecondarySelection;
            let keyboard = secondary_keyboard(ctx, &state);
            let text = secondary_styles_text(&state);
            let origin = state.origin.clone();
            Transition::keep(
                state,
                vec![Effect::Edit {
                    origin,
                    text,
                    keyboard: Some(keyboard),
                }],
            )
        }
        ConversationEvent::Cancel => cancelled(state),
        _ => unknown_action(state, event),
    }
}

fn secondary_step(
    ctx: &TransitionContext<'_>,
    mut state: ConversationState,
    event: &ConversationEvent,
) -> Transition {
    match event {
        ConversationEvent::ToggleSecondary(id) => {
            match toggle(
                &ctx.secondary,
                &mut state,
                id,
                Selection::Secondary,
                ctx.max_selected,
            ) {
                Some(notice) => Transition::keep(state, vec![Effect::Notice(notice)]),
                None => {
                    let keyboard = secondary_keyboard(ctx, &state);
                    let text = secondary_styles_text(&state);
                    let origin = state.origin.clone();
                    Transition::keep(
                        state,
                        vec![Effect::Edit {
                            origin,
                            text,
                            keyboard: Some(keyboard),
                        }],
                    )
                }
            }
        }
        ConversationEvent::Skip => {
            state.selected_secondary.clear();
            let keyboard = secondary_keyboard(ctx, &state);
            let text = secondary_styles_text(&state);
            let origin = state.origin.clone();
            Transition::keep(
                state,
                vec![Effect::Edit {
                    origin,
                    text,
                    keyboard: Some(keyboard),
                }],
            )
        }
        ConversationEvent::Confirm => {
            if state.selected_styles.is_empty() {
                // Unreachable through normal flow but checked anyway.
                return Transition::keep(
                    state,
                    vec![Effect::Notice("Select at least one style first.".into())],
                );
            }
            let selection = FinalizedSelection {
                account: state.account,
                prompt: state.prompt.clone(),
                styles: state.selected_styles.clone(),
                secondary_styles: state.selected_secondary.clone(),
            };
            debug!(
                account = %state.account,
                styles = selection.styles.len(),
                secondary = selection.secondary_styles.len(),
                "conversation confirmed, handing off to orchestrator"
            );
            Transition::clear(vec![
                Effect::Edit {
                    origin: state.origin.clone(),
                    text: format!(
                        "Generating {} job(s) for \"{}\"...",
                        selection.styles.len(),
                        selection.prompt
                    ),
                    keyboard: None,
                },
                Effect::StartGeneration(selection),
            ])
        }
        ConversationEvent::Cancel => cancelled(state),
        _ => unknown_action(state, event),
    }
}

#[derive(Clone, Copy)]
enum Selection {
    Primary,
    Secondary,
}

/// Apply a symmetric-difference toggle. Returns `Some(notice)` when the
/// toggle is rejected (invisible style, or the combined cap is hit), in
/// which case the state is left unchanged.
fn toggle(
    visible: &[&Style],
    state: &mut ConversationState,
    id: &str,
    which: Selection,
    max_selected: usize,
) -> Option<String> {
    let Some(style) = visible.iter().find(|s| s.id == id) else {
        return Some("That style is not available.".into());
    };

    let list = match which {
        Selection::Primary => &mut state.selected_styles,
        Selection::Secondary => &mut state.selected_secondary,
    };

    if let Some(pos) = list.iter().position(|name| name == &style.name) {
        list.remove(pos);
        return None;
    }

    // Cap is checked at the moment of the attempted addition.
    if state.selected_count() >= max_selected {
        return Some(format!("You can select at most {max_selected} styles."));
    }

    let list = match which {
        Selection::Primary => &mut state.selected_styles,
        Selection::Secondary => &mut state.selected_secondary,
    };
    list.push(style.name.clone());
    None
}

fn cancelled(state: ConversationState) -> Transition {
    Transition::clear(vec![Effect::Edit {
        origin: state.origin,
        text: "Cancelled.".into(),
        keyboard: None,
    }])
}

fn unknown_action(state: ConversationState, event: &ConversationEvent) -> Transition {
    debug!(account = %state.account, ?event, action = %state.action, "unrecognized event for step");
    Transition::keep(state, vec![Effect::Notice("Unknown action.".into())])
}

fn select_styles_text(prompt: &str) -> String {
    format!("Prompt: \"{prompt}\"\nPick one or more styles, then press Done.")
}

fn secondary_styles_text(state: &ConversationState) -> String {
    format!(
        "Styles: {}\nAdd secondary styles, or press Confirm to start.",
        state.selected_styles.join(", ")
    )
}

fn primary_keyboard(ctx: &TransitionContext<'_>, state: &ConversationState) -> Keyboard {
    Keyboard {
        toggles: toggle_buttons(&ctx.styles, &state.selected_styles),
        actions: vec![ActionButton::Done, ActionButton::Cancel],
    }
}

fn secondary_keyboard(ctx: &TransitionContext<'_>, state: &ConversationState) -> Keyboard {
    Keyboard {
        toggles: toggle_buttons(&ctx.secondary, &state.selected_secondary),
        actions: vec![ActionButton::Skip, ActionButton::Confirm, ActionButton::Cancel],
    }
}

fn toggle_buttons(visible: &[&Style], selected: &[String]) -> Vec<ToggleButton> {
    visible
        .iter()
        .map(|style| ToggleButton {
            label: style.name.clone(),
            style_id: style.id.clone(),
            selected: selected.iter().any(|name| name == &style.name),
        })
        .collect()
}

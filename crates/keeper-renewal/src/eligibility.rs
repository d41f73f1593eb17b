//! Eligibility gate: is the renewal control usable right now?
//!
//! The panel renders a cooling-down control with utility classes. Only
//! unconditional tokens count: `opacity-50` dims the control, while a
//! variant-prefixed token such as `disabled:opacity-50` only styles a state
//! the control may never be in.

use keeper_settings::GateSettings;

/// Class tokens of the renewal control as rendered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlState {
    /// Whitespace-separated tokens of the `class` attribute.
    pub class_tokens: Vec<String>,
}

impl ControlState {
    /// Split a raw `class` attribute into tokens.
    pub fn from_class_attr(class: &str) -> Self {
        Self {
            class_tokens: class.split_whitespace().map(String::from).collect(),
        }
    }

    fn has_token(&self, token: &str) -> bool {
        self.class_tokens.iter().any(|t| t == token)
    }
}

/// Tokens that mark a cooling-down control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateMarkers {
    /// Dimmed-rendering token.
    pub dimmed: String,
    /// Pointer-disabled token.
    pub no_pointer: String,
}

impl Default for GateMarkers {
    fn default() -> Self {
        Self::from(&GateSettings::default())
    }
}

impl From<&GateSettings> for GateMarkers {
    fn from(settings: &GateSettings) -> Self {
        Self {
            dimmed: settings.dimmed_token.clone(),
            no_pointer: settings.no_pointer_token.clone(),
        }
    }
}

/// Gate verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    /// The control can be followed.
    Eligible,
    /// The target refuses another renewal for now.
    CoolingDown,
    /// The control was not found; no judgement possible.
    Indeterminate,
}

/// Whether the control is in its cooling-down rendering.
pub fn is_cooling_down(state: &ControlState, markers: &GateMarkers) -> bool {
    state.has_token(&markers.dimmed) || state.has_token(&markers.no_pointer)
}

/// Classify the control. An absent control is [`Eligibility::Indeterminate`].
pub fn assess(state: Option<&ControlState>, markers: &GateMarkers) -> Eligibility {
    match state {
        None => Eligibility::Indeterminate,
        Some(s) if is_cooling_down(s, markers) => Eligibility::CoolingDown,
        Some(_) => Eligibility::Eligible,
    }
}

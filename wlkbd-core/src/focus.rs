//! Focus aggregation over every keyboard.

/// An edge of the aggregated focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTransition {
    /// No keyboard had focus, now one does.
    Entered,
    /// The last focused keyboard lost focus.
    Left,
}

/// Turns per-device focus flags into edge-triggered transitions.
#[derive(Debug, Default)]
pub struct FocusAggregator {
    focused: bool,
}

impl FocusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last aggregated value.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Recompute whether any device has focus, and report the transition if it changed.
    pub fn evaluate<I>(&mut self, device_focus: I) -> Option<FocusTransition>
    where
        I: IntoIterator<Item = bool>,
    {
        let focused = device_focus.into_iter().any(|focused| focused);
        match (self.focused, focused) {
            (false, true) => {
                self.focused = true;
                Some(FocusTransition::Entered)
            },
            (true, false) => {
                self.focused = false;
                Some(FocusTransition::Left)
            },
            _ => None,
        }
    }

    /// Forget the last aggregated value without reporting a transition.
    pub fn reset(&mut self) {
        self.focused = false;
    }
}

//! Callback trait for event consumers.

use crate::Event;

/// Receives events from the parser.
///
/// Returning `false` from [`event`](ParseCallback::event) stops the parse.
pub trait ParseCallback<'src> {
    /// Handle a single event. Return `false` to abort parsing.
    fn event(&mut self, event: Event<'src>) -> bool;
}

impl<'src> ParseCallback<'src> for Vec<Event<'src>> {
    fn event(&mut self, event: Event<'src>) -> bool {
        self.push(event);
        true
    }
}

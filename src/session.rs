//! Per-run tally of external calls.

use std::fmt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    calls: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call attempt.
    pub fn increment(&mut self) {
        self.calls += 1;
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Session Complete] Total API calls made this run: {}",
            self.calls
        )
    }
}

// -- Tests -------------------------------------------------------------------

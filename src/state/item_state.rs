/// Item state definitions for tracking thread harvest outcomes
use std::fmt;

/// Final state of one harvested thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Every content page was fetched and extracted
    Complete,

    /// Pagination stopped early (fetch/extract error or page cap); fragments
    /// gathered before that point are kept
    Partial,

    /// The first content page failed, no fragments were collected
    Failed,

    /// The run was cancelled before the thread finished
    Cancelled,
}

impl ItemState {
    /// Returns true if the thread ended because of an error or a cap
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Partial | Self::Failed)
    }

    /// Short lowercase label used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns all item states
    pub fn all_states() -> [Self; 4] {
        [Self::Complete, Self::Partial, Self::Failed, Self::Cancelled]
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

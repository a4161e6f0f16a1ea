use shared_types::{ItemAggregate, VoteDirection};

/// Result of applying one vote.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome {
    /// The vote changed the aggregate.
    Applied {
        old: ItemAggregate,
        new: ItemAggregate,
        previous_direction: VoteDirection,
    },
    /// The stored direction already matched. Nothing was written.
    NoOp,
}

impl LedgerOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// The aggregate after the vote, when it changed.
    #[must_use]
    pub fn new_aggregate(&self) -> Option<&ItemAggregate> {
        match self {
            Self::Applied { new, .. } => Some(new),
            Self::NoOp => None,
        }
    }
}

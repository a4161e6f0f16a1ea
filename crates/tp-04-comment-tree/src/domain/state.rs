//! Per-root maintenance state and signal coalescing.

use shared_types::ItemId;
use std::collections::BTreeSet;

/// What a pending pass has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyKind {
    /// Comments were added or removed; relink everything.
    Structural,
    /// Only these comments' votes changed.
    RankOnly(BTreeSet<ItemId>),
}

impl DirtyKind {
    pub fn rank_only(comment_id: ItemId) -> Self {
        Self::RankOnly(BTreeSet::from([comment_id]))
    }

    /// Structural dominates; rank-only sets are unioned.
    #[must_use]
    pub fn merge(self, other: DirtyKind) -> DirtyKind {
        match (self, other) {
            (Self::RankOnly(mut a), Self::RankOnly(b)) => {
                a.extend(b);
                Self::RankOnly(a)
            }
            _ => Self::Structural,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TreeState {
    #[default]
    Clean,
    Dirty(DirtyKind),
    Rebuilding,
    Resorting,
}

impl TreeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Dirty(DirtyKind::Structural) => "dirty_structural",
            Self::Dirty(DirtyKind::RankOnly(_)) => "dirty_rank_only",
            Self::Rebuilding => "rebuilding",
            Self::Resorting => "resorting",
        }
    }

    pub fn in_flight(&self) -> bool {
        matches!(self, Self::Rebuilding | Self::Resorting)
    }
}

/// How a signal was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The root was clean; the caller now drives the passes.
    Start,
    /// Merged into a pass that has not started yet.
    Merged,
    /// A pass is running; this signal rides on the one follow-up pass.
    Queued,
}

/// State of one root plus the signal that arrived during the current pass.
///
/// A root whose passes keep failing is parked: it stays `Dirty` with nobody
/// driving it until the next signal or the maintenance retry picks it up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootTracker {
    state: TreeState,
    pending: Option<DirtyKind>,
    failures: u32,
    parked: bool,
}

impl RootTracker {
    pub fn state(&self) -> &TreeState {
        &self.state
    }

    pub fn signal(&mut self, kind: DirtyKind) -> Signal {
        match std::mem::take(&mut self.state) {
            TreeState::Clean => {
                self.state = TreeState::Dirty(kind);
                Signal::Start
            }
            TreeState::Dirty(existing) => {
                self.state = TreeState::Dirty(existing.merge(kind));
                if std::mem::take(&mut self.parked) {
                    Signal::Start
                } else {
                    Signal::Merged
                }
            }
            running => {
                self.state = running;
                self.pending = Some(match self.pending.take() {
                    Some(pending) => pending.merge(kind),
                    None => kind,
                });
                Signal::Queued
            }
        }
    }

    /// Move `Dirty(kind)` into the matching in-flight state and hand back
    /// the work. `None` if the root is not dirty.
    pub fn begin(&mut self) -> Option<DirtyKind> {
        match std::mem::take(&mut self.state) {
            TreeState::Dirty(kind) => {
                self.state = match kind {
                    DirtyKind::Structural => TreeState::Rebuilding,
                    DirtyKind::RankOnly(_) => TreeState::Resorting,
                };
                Some(kind)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// End the current pass. Returns `true` when a queued signal made the
    /// root dirty again and another pass must run.
    pub fn finish(&mut self) -> bool {
        self.failures = 0;
        match self.pending.take() {
            Some(kind) => {
                self.state = TreeState::Dirty(kind);
                true
            }
            None => {
                self.state = TreeState::Clean;
                false
            }
        }
    }

    /// A pass failed. Its work and anything queued meanwhile become the next
    /// pass. Returns the number of consecutive failures.
    pub fn fail(&mut self, failed: DirtyKind) -> u32 {
        let kind = match self.pending.take() {
            Some(pending) => failed.merge(pending),
            None => failed,
        };
        self.state = TreeState::Dirty(kind);
        self.failures += 1;
        self.failures
    }

    /// Stop retrying for now; the root stays dirty.
    pub fn park(&mut self) {
        self.parked = true;
    }

    pub fn is_parked(&self) -> bool {
        self.parked
    }

    /// Take a parked root back for another round of attempts.
    pub fn unpark(&mut self) -> bool {
        let was_parked = std::mem::take(&mut self.parked);
        if was_parked {
            self.failures = 0;
        }
        was_parked
    }

    pub fn is_clean(&self) -> bool {
        self.state == TreeState::Clean && self.pending.is_none()
    }
}

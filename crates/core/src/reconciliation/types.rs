//! Reconciliation result types.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tally_shared::types::PostingId;

use crate::ledger::{PersistedPosting, PostingDraft};

/// A freshly generated posting, optionally carrying the id of the stored
/// posting it is known to replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePosting {
    /// Id of the stored posting this one corresponds to, if known.
    pub id: Option<PostingId>,
    /// Generated content.
    pub posting: PostingDraft,
}

impl From<PostingDraft> for CandidatePosting {
    fn from(posting: PostingDraft) -> Self {
        Self { id: None, posting }
    }
}

/// How a posting differs between the generated and the stored set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Identical in both sets.
    Unchanged,
    /// Stored posting whose content changed.
    Diff,
    /// Only generated.
    New,
    /// Only stored.
    Deleted,
}

/// One reconciled posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "classification", rename_all = "snake_case")]
pub enum ClassifiedPosting {
    /// Generated content equals the stored posting.
    Unchanged {
        /// Stored id.
        id: PostingId,
        /// Shared content.
        posting: PostingDraft,
    },
    /// Stored posting replaced by different generated content.
    Diff {
        /// Stored posting.
        before: PersistedPosting,
        /// Generated content.
        after: PostingDraft,
    },
    /// Generated posting with no stored counterpart.
    New {
        /// Generated content.
        posting: PostingDraft,
    },
    /// Stored posting with no generated counterpart.
    Deleted {
        /// Stored posting.
        before: PersistedPosting,
    },
}

impl ClassifiedPosting {
    /// Classification tag.
    #[must_use]
    pub const fn classification(&self) -> Classification {
        match self {
            Self::Unchanged { .. } => Classification::Unchanged,
            Self::Diff { .. } => Classification::Diff,
            Self::New { .. } => Classification::New,
            Self::Deleted { .. } => Classification::Deleted,
        }
    }

    /// The current content: generated where there is one, stored otherwise.
    #[must_use]
    pub fn posting(&self) -> &PostingDraft {
        match self {
            Self::Unchanged { posting, .. } | Self::New { posting } => posting,
            Self::Diff { after, .. } => after,
            Self::Deleted { before } => &before.posting,
        }
    }

    /// Id of the stored posting involved, if any.
    #[must_use]
    pub fn stored_id(&self) -> Option<PostingId> {
        match self {
            Self::Unchanged { id, .. } => Some(*id),
            Self::Diff { before, .. } | Self::Deleted { before } => Some(before.id),
            Self::New { .. } => None,
        }
    }

    pub(crate) fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.posting()
            .cmp(other.posting())
            .then_with(|| self.classification().cmp(&other.classification()))
            .then_with(|| self.stored_id().cmp(&other.stored_id()))
    }
}

/// Counts per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Unchanged postings.
    pub unchanged: usize,
    /// Changed postings.
    pub diff: usize,
    /// New postings.
    pub new: usize,
    /// Deleted postings.
    pub deleted: usize,
}

impl ReconciliationSummary {
    /// Counts the classifications of `results`.
    #[must_use]
    pub fn from_results(results: &[ClassifiedPosting]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.classification() {
                Classification::Unchanged => summary.unchanged += 1,
                Classification::Diff => summary.diff += 1,
                Classification::New => summary.new += 1,
                Classification::Deleted => summary.deleted += 1,
            }
        }
        summary
    }

    /// Whether regenerating would change the stored ledger.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.diff + self.new + self.deleted > 0
    }
}

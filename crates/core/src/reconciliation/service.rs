//! Matching generated postings against stored ones.
//!
//! Matching runs in passes over canonically sorted inputs:
//! 1. by stored id, when the candidate carries one;
//! 2. by identical content;
//! 3. by similarity key (currency, debit account, credit account, value
//!    date), which classifies the pair as a diff.
//!
//! Unmatched candidates are new; unmatched stored postings are deleted.

use chrono::NaiveDate;
use tally_shared::types::{Currency, EntityId};

use super::types::{CandidatePosting, ClassifiedPosting};
use crate::ledger::{PersistedPosting, PostingDraft};

/// Reconciliation service.
pub struct ReconciliationService;

impl ReconciliationService {
    /// Classifies every generated and stored posting.
    ///
    /// The result does not depend on input order.
    #[must_use]
    pub fn reconcile(
        generated: &[CandidatePosting],
        stored: &[PersistedPosting],
    ) -> Vec<ClassifiedPosting> {
        let mut generated: Vec<&CandidatePosting> = generated.iter().collect();
        generated.sort_by(|a, b| a.posting.cmp(&b.posting).then_with(|| a.id.cmp(&b.id)));
        let mut stored: Vec<&PersistedPosting> = stored.iter().collect();
        stored.sort_by(|a, b| a.posting.cmp(&b.posting).then_with(|| a.id.cmp(&b.id)));

        let mut matcher = Matcher {
            taken: vec![false; stored.len()],
            stored,
            results: Vec::new(),
        };

        let mut pending = Vec::new();
        for candidate in generated {
            let found = candidate
                .id
                .and_then(|id| matcher.find(|posting| posting.id == id));
            match found {
                Some(index) => matcher.pair(index, candidate),
                None => pending.push(candidate),
            }
        }

        let mut remaining = Vec::new();
        for candidate in pending {
            match matcher.find(|posting| posting.posting == candidate.posting) {
                Some(index) => matcher.pair(index, candidate),
                None => remaining.push(candidate),
            }
        }

        for candidate in remaining {
            let key = similarity_key(&candidate.posting);
            match matcher.find(|posting| similarity_key(&posting.posting) == key) {
                Some(index) => matcher.pair(index, candidate),
                None => matcher.results.push(ClassifiedPosting::New {
                    posting: candidate.posting.clone(),
                }),
            }
        }

        let Matcher {
            stored,
            taken,
            mut results,
        } = matcher;
        results.extend(
            stored
                .into_iter()
                .zip(taken)
                .filter(|(_, taken)| !taken)
                .map(|(posting, _)| ClassifiedPosting::Deleted {
                    before: posting.clone(),
                }),
        );

        results.sort_by(ClassifiedPosting::canonical_cmp);
        results
    }
}

struct Matcher<'a> {
    stored: Vec<&'a PersistedPosting>,
    taken: Vec<bool>,
    results: Vec<ClassifiedPosting>,
}

impl Matcher<'_> {
    fn find(&self, predicate: impl Fn(&PersistedPosting) -> bool) -> Option<usize> {
        self.stored
            .iter()
            .zip(&self.taken)
            .position(|(posting, taken)| !taken && predicate(*posting))
    }

    fn pair(&mut self, index: usize, candidate: &CandidatePosting) {
        self.taken[index] = true;
        let stored = self.stored[index];
        let result = if stored.posting == candidate.posting {
            ClassifiedPosting::Unchanged {
                id: stored.id,
                posting: candidate.posting.clone(),
            }
        } else {
            ClassifiedPosting::Diff {
                before: stored.clone(),
                after: candidate.posting.clone(),
            }
        };
        self.results.push(result);
    }
}

fn similarity_key(posting: &PostingDraft) -> (Currency, EntityId, EntityId, NaiveDate) {
    (
        posting.currency,
        posting.debit_account_id,
        posting.credit_account_id,
        posting.value_date,
    )
}

//! Property-based tests for reconciliation.
//!
//! - Property 1: Completeness
//! - Property 2: Order independence

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::EntityId;

use super::tests::{posting, stored};
use super::{CandidatePosting, ClassifiedPosting, ReconciliationService};
use crate::ledger::PersistedPosting;
use crate::ledger::generators::fixtures::{BANK, SUPPLIER, TAX_CATEGORY};

fn account() -> impl Strategy<Value = EntityId> {
    prop_oneof![Just(BANK), Just(SUPPLIER), Just(TAX_CATEGORY)]
}

/// Small value spaces so that exact and similar matches actually occur.
fn draft() -> impl Strategy<Value = crate::ledger::PostingDraft> {
    (account(), account(), 1i64..4i64, 1u32..4u32)
        .prop_map(|(debit, credit, amount, day)| posting(debit, credit, Decimal::new(amount * 100, 0), day))
}

fn inputs() -> impl Strategy<Value = (Vec<CandidatePosting>, Vec<PersistedPosting>)> {
    (
        prop::collection::vec(draft(), 0..8),
        prop::collection::vec(draft(), 0..8),
    )
        .prop_map(|(generated, persisted)| {
            let generated = generated.into_iter().map(CandidatePosting::from).collect();
            let persisted = persisted
                .into_iter()
                .enumerate()
                .map(|(index, draft)| stored(index as u128 + 1, draft))
                .collect();
            (generated, persisted)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1.1: Every Input Accounted For**
    ///
    /// *For any* generated and stored sets, every stored posting appears
    /// exactly once and every generated posting is either new, unchanged
    /// or the after side of a diff.
    #[test]
    fn prop_every_input_accounted_for((generated, persisted) in inputs()) {
        let results = ReconciliationService::reconcile(&generated, &persisted);

        let mut ids: Vec<_> = results.iter().filter_map(ClassifiedPosting::stored_id).collect();
        ids.sort();
        let mut expected: Vec<_> = persisted.iter().map(|p| p.id).collect();
        expected.sort();
        prop_assert_eq!(ids, expected);

        let generated_side = results
            .iter()
            .filter(|r| !matches!(r, ClassifiedPosting::Deleted { .. }))
            .count();
        prop_assert_eq!(generated_side, generated.len());
    }

    /// **Property 2.1: Input Order Does Not Matter**
    ///
    /// *For any* inputs, reversing either list yields the same result.
    #[test]
    fn prop_order_independent((generated, persisted) in inputs()) {
        let forward = ReconciliationService::reconcile(&generated, &persisted);

        let mut generated_rev = generated.clone();
        generated_rev.reverse();
        let mut persisted_rev = persisted.clone();
        persisted_rev.reverse();
        let backward = ReconciliationService::reconcile(&generated_rev, &persisted_rev);

        prop_assert_eq!(forward, backward);
    }

    /// **Property 2.2: Self Reconciliation Is Unchanged**
    ///
    /// *For any* stored set, reconciling it against its own content reports
    /// no changes.
    #[test]
    fn prop_self_reconciliation_unchanged((_, persisted) in inputs()) {
        let generated: Vec<CandidatePosting> =
            persisted.iter().map(|p| CandidatePosting::from(p.posting.clone())).collect();
        let results = ReconciliationService::reconcile(&generated, &persisted);

        let summary = super::ReconciliationSummary::from_results(&results);
        prop_assert!(!summary.has_changes());
        prop_assert_eq!(summary.unchanged, persisted.len());
    }
}

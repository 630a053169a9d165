//! Reconciliation of regenerated postings against the stored ledger.

pub mod service;
pub mod types;

#[cfg(test)]
mod props;

pub use service::ReconciliationService;
pub use types::{CandidatePosting, Classification, ClassifiedPosting, ReconciliationSummary};

//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Collaborators (rate sources, reserve calculators) are reached through traits.
//!
//! # Modules
//!
//! - `currency` - Exchange rate resolution and conversion to local currency
//! - `ledger` - Ledger generators, posting drafts and balance validation
//! - `business_trip` - Business trip summaries against allowance caps
//! - `reconciliation` - Classifying regenerated postings against stored ones

pub mod business_trip;
pub mod currency;
pub mod ledger;
pub mod reconciliation;

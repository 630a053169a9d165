//! Async orchestration for Tally.
//!
//! The engine loads charge data through collaborator traits, prefetches
//! exchange rates, runs the ledger generators, validates balance and
//! persists or reconciles the result.
//!
//! # Modules
//!
//! - `collaborators` - Traits for charge data, posting storage and their errors
//! - `engine` - The `LedgerEngine` facade
//! - `batch` - Concurrent batch generation with cancellation and timeout
//! - `memory` - In-memory collaborator implementations
//! - `error` - Engine errors and their mapping onto `AppError`

pub mod batch;
pub mod collaborators;
pub mod engine;
pub mod error;
pub mod memory;

pub use batch::{BatchOptions, BatchReport, ChargeOutcome};
pub use collaborators::{ChargeAggregator, CollaboratorError, PostingStore};
pub use engine::{ChargeReconciliation, LedgerEngine};
pub use error::EngineError;
pub use memory::{
    FixedReserveCalculator, InMemoryAggregator, InMemoryPostingStore, InMemoryRateSource,
};

//! Business trip summaries and allowance-capped taxable amounts.

pub mod error;
pub mod service;
pub mod types;


pub use error::TripError;
pub use service::BusinessTripService;
pub use types::{
    BusinessTripData, BusinessTripSummary, BusinessTripSummaryRow, DestinationClass,
    LocalizedExpense, SummaryCategory, TripCategory, TripExpense, TripMeta, TripPolicy,
};

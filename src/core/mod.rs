//! Core business logic abstractions

pub mod config;
pub mod convert;
pub mod log;
pub mod rates;
pub mod state;

// Re-export main types for cleaner imports
pub use rates::{RateProvider, RateSnapshot, RateTable};
pub use state::{ConverterState, Event, FETCH_ERROR_MESSAGE, reduce};

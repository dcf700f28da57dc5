//! Admission control and usage accounting

pub mod rate_limiter;
pub mod usage;

pub use rate_limiter::{
    AdmissionController, AdmissionError, CounterStore, CounterStoreError, InMemoryCounterStore,
};
pub use usage::{UNLIMITED, UsageAccountant};

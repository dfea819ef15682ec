#![forbid(unsafe_code)]

//! Behavioral contract suite for `EventStore` implementations.
//!
//! Any adapter can run the whole suite with one macro invocation:
//!
//! ```ignore
//! tasklog_testing::contract::event_store_contract_tests! {
//!     suite = in_memory,
//!     make_store = tasklog_memory::InMemoryEventStore::new,
//! }
//! ```

pub mod contract;

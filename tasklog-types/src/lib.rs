#![forbid(
    invalid_value,
    overflowing_literals,
    unconditional_recursion,
    unused_allocation,
    unsafe_code
)]
#![deny(
    bad_style,
    deprecated,
    meta_variable_misuse,
    non_ascii_idents,
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_code,
    unused_assignments,
    unused_attributes,
    unused_extern_crates,
    unused_imports,
    unused_must_use,
    unused_mut,
    unused_parens,
    unused_variables
)]

//! Shared vocabulary types and traits for the tasklog command/event engine.
//!
//! This crate provides the foundational types shared between the `tasklog`
//! engine, event store adapters such as `tasklog-memory`, and domain crates.
//!
//! # Overview
//!
//! This crate contains:
//! - Core traits: `Event`, `Aggregate`, `CommandLogic`, `EventStore`
//! - State reconstruction: `reduce`
//! - Domain types: `StreamId`, `StreamVersion`, `StreamWrites`, `StreamWriteEntry`
//! - Event handling: `EventStreamReader`, `EventStreamSlice`, `NewEvents`
//! - Errors: `EventStoreError`, `CommandError`, `Operation`

mod command;
mod errors;
mod store;
mod validation;

pub use command::{Aggregate, CommandLogic, Event, NewEvents, reduce};
pub use errors::CommandError;
pub use store::{
    EventStore, EventStoreError, EventStreamReader, EventStreamSlice, Operation, StreamId,
    StreamIdError, StreamVersion, StreamWriteEntry, StreamWrites,
};

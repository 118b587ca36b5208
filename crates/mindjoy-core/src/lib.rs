//! Core types and trait definitions for Mindjoy.
//!
//! This crate owns the ordering and entitlement rules: positioned collections
//! (daily tasks, goals, principles), the reorder planner, the subscription
//! state machine, and the habit ledger. It is free of HTTP and database
//! dependencies; storage is reached through [`store::RecordStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod app;
pub mod clock;
pub mod collection;
pub mod entitlement;
pub mod error;
pub mod gate;
pub mod goals;
pub mod habit;
pub mod item;
pub mod ledger;
pub mod planner;
pub mod principles;
pub mod progress;
pub mod store;
pub mod tasks;

pub use app::Mindjoy;
pub use error::{Error, Result};

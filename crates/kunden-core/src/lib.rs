//! Core types and trait definitions for the customer/agent registry.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the entity records, the [`roster::Roster`] aggregate that keeps both sides
//! of every relationship in agreement, the validation rules, the read/write
//! views and the [`store::CustomerStore`] abstraction with an in-memory
//! backend.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod address;
pub mod agent;
pub mod customer;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod memory;
pub mod roster;
pub mod store;
pub mod user;
pub mod validate;
pub mod view;

pub use error::{DomainError, Error, ErrorKind, Result};

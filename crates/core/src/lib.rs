//! Shelfwise Core - Shared types and inventory algorithms.
//!
//! This crate provides the domain layer used across all Shelfwise components:
//! - `server` - JSON REST service for inventory and point of sale
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Everything that decides *what* happens to stock, money or
//! permissions lives here so it can be tested without a database; the server
//! decides *how* it is persisted.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money and status enums
//! - [`fifo`] - First-in-first-out lot allocation planner
//! - [`totals`] - Sale/order totals, discounts and payment settlement
//! - [`numbering`] - Daily-reset document numbers
//! - [`permissions`] - Roles, operations and the permission table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fifo;
pub mod numbering;
pub mod permissions;
pub mod totals;
pub mod types;

pub use permissions::{Operation, Policy, Role};
pub use types::*;

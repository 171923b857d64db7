//! Domain models for the Shelfwise server.
//!
//! Row types live next to their queries in `crate::db`; these are the shapes
//! handlers and services work with and the JSON the API returns.

pub mod catalog;
pub mod customer;
pub mod demand;
pub mod document;
pub mod location;
pub mod session;
pub mod stock;
pub mod user;

pub use catalog::{Brand, Discount, Product, Vendor};
pub use customer::Customer;
pub use demand::Demand;
pub use document::{Document, DocumentDetail, DocumentLine};
pub use location::{Outlet, Warehouse};
pub use session::{CurrentUser, keys as session_keys};
pub use stock::{StockLot, StockSummary};
pub use user::User;

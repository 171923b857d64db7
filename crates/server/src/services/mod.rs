//! Business logic services for Shelfwise.
//!
//! # Services
//!
//! - `auth` - Password login, registration bootstrap and user administration
//! - `stock` - Stock receipt, FIFO allocation and transfers
//! - `documents` - Sale and order finalization, due collection, order workflow
//! - `demands` - Outlet stock requests and their fulfilment

pub mod auth;
pub mod demands;
pub mod documents;
pub mod stock;

pub use auth::AuthService;
pub use demands::DemandService;
pub use documents::DocumentService;
pub use stock::StockService;

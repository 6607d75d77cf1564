//! Clothing storefront service.
//!
//! Catalog browsing with filters and pagination, per-user carts (server-side
//! for authenticated users, local for guests), and the cart-to-order checkout
//! flow: stock validated against a single product snapshot, order + stock
//! decrement + cart clear committed as one unit, confirmation email
//! dispatched best-effort after commit.

pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod identity;
pub mod notify;
pub mod seed;
pub mod session;
pub mod store;

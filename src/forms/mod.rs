//! Form submissions validated before anything reaches the catalog store.
//!
//! Each form converts into a typed payload via `TryFrom`; blank fields and
//! unparseable prices are rejected here and never reach the gateway.

pub mod products;
pub mod users;

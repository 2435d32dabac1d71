//! Sealdrop HTTP API
//!
//! Library half of the `sealdrop-api` binary, exposed so integration tests can
//! build the router against in-memory collaborators.

pub mod api_doc;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod utils;

//! HTTP server for the danmu aggregation core.
//!
//! Exposed as a library so integration tests can build the router
//! in-process with mock collaborators.

pub mod api;
pub mod state;

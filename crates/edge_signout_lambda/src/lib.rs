//! Lambda runtime integration for the edge sign-out service.
//!
//! This crate owns runtime integration details (the event-boundary handler
//! and the Lambda entry point). Response construction stays in
//! `edge_signout_core`.

pub mod handlers;

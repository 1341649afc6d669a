//! Shared edge sign-out domain primitives.
//!
//! This crate owns deterministic response construction and the deployment
//! description contract. It intentionally excludes Lambda runtime and
//! packaging concerns; those live in `edge_signout_lambda` and `xtask`.

pub mod contract;
pub mod cookie;
pub mod deployment;
pub mod signout;

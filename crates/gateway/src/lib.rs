//! `qg-gateway`: HTTP server for the shared daily quota, plus the
//! `quotagate` CLI.

pub mod api;
pub mod cli;
pub mod runtime;
pub mod state;

//! `qg-domain`: shared types for quotagate.
//!
//! Holds the configuration tree, the workspace-wide [`error::Error`], the
//! structured [`trace::TraceEvent`] records, the civil-day [`clock`]
//! helpers and the [`quota`] counter plus its wire format.  Both the
//! gateway (server) and the mirror (client) depend on this crate so the two
//! sides agree on limits, day boundaries and JSON shapes.

pub mod clock;
pub mod config;
pub mod error;
pub mod quota;
pub mod trace;

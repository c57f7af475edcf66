//! Server-side state owned by the gateway process.

pub mod quota;

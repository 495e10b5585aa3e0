//! Platform credential bridge for Swift and Kotlin hosts.
//!
//! Re-exports [`credkit_core`]; this crate is the library binding generation runs against.

pub use credkit_core::*;

uniffi::setup_scaffolding!("credkit");

//! Front-end helpers for the `railfence` binary.
//!
//! The zigzag cipher itself lives in [`railfence_core`]. This crate adds the
//! collaborators the command line drives next to it:
//!
//! * [`breach`]: range-query exposure lookup and credential audits.
//! * [`signing`]: Ed25519 key files and detached file signatures.
//! * [`logging`]: `tracing` subscriber setup.

pub mod breach;
pub mod logging;
pub mod signing;

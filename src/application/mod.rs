//! Application layer orchestrating the domain rules over the data store.
//!
//! This module defines `CrediarioService`, the single entry point the CLI
//! and tests drive. It validates the caller's session, loads the records an
//! operation needs, and commits the resulting `ChangeSet` atomically.

pub mod service;

//! Storage backends.
//!
//! * [`sqlite`] is the production backend.
//! * [`memory`] keeps everything in process. It is handy for embedding the engine and for tests.
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

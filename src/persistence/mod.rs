//! Durable state for railwatch: the set of trains already notified about.

pub mod error;
pub mod json_file;
pub mod traits;

pub use json_file::JsonFileKnownSetStore;

#![warn(missing_docs)]
//! railwatch watches a live train snapshot and notifies configured channels
//! the first time each train appears, with quiet hours, rate limiting and a
//! daily reset of what counts as already seen.

pub mod cmd;
pub mod config;
pub mod engine;
pub mod http_client;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;

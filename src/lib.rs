pub mod admin;
pub mod categories;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod stats;
pub mod store;
pub mod updater;
pub mod util;

pub use error::{Error, Result};

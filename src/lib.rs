pub mod aggregator;
pub mod api;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod kv;
pub mod logging;
pub mod models;
pub mod utils;
pub mod web;

pub use error::{Error, Result};

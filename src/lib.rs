pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod service;
pub mod state;

pub use error::{AppError, Result};

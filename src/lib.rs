pub mod config;
pub mod cryptor;
pub mod db;
pub mod error;
pub mod passhash;
pub mod secrets;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

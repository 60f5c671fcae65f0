pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod logging;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use models::{Priority, Tag, Todo};
pub use utils::Profile;

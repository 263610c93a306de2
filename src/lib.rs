pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;
pub use database::{MemoryStore, PayrollStore, PgStore};
pub use services::{AttendancePolicy, PolicyCache};

pub mod database;
pub mod metrics;
pub mod storage;

pub use database::Database;
pub use storage::{LocalStorage, Storage};

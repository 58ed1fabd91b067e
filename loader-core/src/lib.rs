pub mod config;
pub mod connection;
pub mod constants;
pub mod db;
pub mod error;
pub mod schema;
pub mod sheet;
pub mod sync;

pub use error::{LoaderError, Result};

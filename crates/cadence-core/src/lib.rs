pub mod amendment;
pub mod config;
pub mod engine;
pub mod error;
pub mod flock;
pub mod graph;
pub mod io;
pub mod paths;
pub mod plan;
pub mod platform;
pub mod shell;
pub mod store;
pub mod task;
pub mod tracker;
pub mod types;

pub use error::{CadenceError, Result};

mod config;
mod partial;

pub use config::*;

pub mod color;
pub mod config;
pub mod engine;
pub mod script;

pub use config::CardConfig;
pub use engine::Card;

pub mod config;
pub mod deepfake;
pub mod extraction;
pub mod handlers;
pub mod models;
pub mod verification;

pub use config::{Config, ConfigError};
pub use handlers::{build_router, AppState};
pub use models::*;
pub use verification::FactVerifier;

pub mod api;
pub mod config;
pub mod error;
pub mod redaction;
pub mod state;
pub mod store;
pub mod uploads;

pub use api::build_app;
pub use config::EngineConfig;
pub use state::AppState;
pub use store::MockStore;

pub mod api;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod files;

pub use api::ChatApi;
pub use client::{ApiClient, SendPayload};
pub use controller::{ConversationController, Draft};
pub use error::{ClientError, ClientResult};
pub use files::LocalFile;

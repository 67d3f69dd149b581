use prismchat_shared::RouteMode;
use serde::{Deserialize, Serialize};

// Upload query string: ?route=prismguard
#[derive(Deserialize, Default)]
pub struct UploadQuery {
    #[serde(default)]
    pub route: Option<RouteMode>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    /// The request never produced a response.
    #[snafu(display("network error calling {endpoint}: {source}"))]
    Network {
        endpoint: &'static str,
        source: reqwest::Error,
    },

    /// The backend answered, but not with success, on an endpoint where
    /// that only means "unreachable" to the caller.
    #[snafu(display("{endpoint} is unavailable (status {status})"))]
    Unavailable { endpoint: &'static str, status: u16 },

    #[snafu(display("conversation '{id}' not found (status {status})"))]
    NotFound { id: String, status: u16 },

    #[snafu(display("upload failed: {details}"))]
    Upload { details: String },

    #[snafu(display("chat failed: {status} {body}"))]
    Send { status: u16, body: String },

    #[snafu(display("invalid request: {details}"))]
    Validation { details: String },

    #[snafu(display("failed to decode {endpoint} response: {source}"))]
    Decode {
        endpoint: &'static str,
        source: reqwest::Error,
    },

    #[snafu(display("failed to read {path}: {source}"))]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
}

impl ClientError {
    /// Transport-level failures, as opposed to a backend that answered.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network { .. } | ClientError::Unavailable { .. })
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

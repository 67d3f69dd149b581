use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};

pub use futures_util::future::BoxFuture;

/// A file received by the upload endpoint, before it is stored.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct RedactedImage {
    pub bytes: Vec<u8>,
    /// Extension to store the redacted bytes under, when it differs from
    /// the original file's.
    pub extension: Option<&'static str>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RedactionError {
    #[snafu(display("vision service request failed: {source}"))]
    Http { source: reqwest::Error },

    #[snafu(display("vision service returned {status}: {body}"))]
    Status { status: u16, body: String },

    #[snafu(display("vision service returned invalid image data: {source}"))]
    Decode { source: base64::DecodeError },
}

/// Server-side image transformation applied to prismguard uploads.
pub trait Redactor: Send + Sync {
    fn name(&self) -> &'static str;
    fn redact<'a>(
        &'a self,
        file: &'a IncomingFile,
    ) -> BoxFuture<'a, Result<RedactedImage, RedactionError>>;
}

/// Stores files untouched. Used when no vision service is configured.
pub struct PassthroughRedactor;

impl Redactor for PassthroughRedactor {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn redact<'a>(
        &'a self,
        file: &'a IncomingFile,
    ) -> BoxFuture<'a, Result<RedactedImage, RedactionError>> {
        Box::pin(async move {
            tracing::warn!(
                file = %file.file_name,
                "no vision service configured, storing prismguard upload unredacted"
            );
            Ok(RedactedImage {
                bytes: file.bytes.clone(),
                extension: None,
            })
        })
    }
}

#[derive(Deserialize)]
struct VisionEntity {
    label: String,
}

#[derive(Deserialize)]
struct VisionResponse {
    redacted_image_b64: String,
    #[serde(default)]
    entities: Vec<VisionEntity>,
    #[serde(default)]
    timing_ms: f64,
}

/// Client for the PrismGuard Vision anonymizer (`POST /v1/anonymize/image`).
pub struct VisionRedactor {
    client: reqwest::Client,
    base_url: String,
}

impl VisionRedactor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn anonymize(&self, file: &IncomingFile) -> Result<RedactedImage, RedactionError> {
        let url = format!("{}/v1/anonymize/image", self.base_url);

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .context(HttpSnafu)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context(HttpSnafu)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return StatusSnafu { status, body }.fail();
        }

        let payload = response.json::<VisionResponse>().await.context(HttpSnafu)?;
        let bytes = BASE64_STANDARD
            .decode(payload.redacted_image_b64.trim())
            .context(DecodeSnafu)?;

        let labels: Vec<&str> = payload.entities.iter().map(|e| e.label.as_str()).collect();
        tracing::info!(
            file = %file.file_name,
            entities = ?labels,
            timing_ms = payload.timing_ms,
            "image redacted"
        );

        // The anonymizer always re-encodes as PNG.
        Ok(RedactedImage {
            bytes,
            extension: Some("png"),
        })
    }
}

impl Redactor for VisionRedactor {
    fn name(&self) -> &'static str {
        "prismguard-vision"
    }

    fn redact<'a>(
        &'a self,
        file: &'a IncomingFile,
    ) -> BoxFuture<'a, Result<RedactedImage, RedactionError>> {
        Box::pin(self.anonymize(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Multipart, http::StatusCode, routing::post};
    use serde_json::json;

    fn sample() -> IncomingFile {
        IncomingFile {
            file_name: "face.jpg".into(),
            content_type: "image/jpeg".into(),
            bytes: b"original-pixels".to_vec(),
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn passthrough_keeps_bytes() {
        let file = sample();
        let out = PassthroughRedactor.redact(&file).await.unwrap();
        assert_eq!(out.bytes, file.bytes);
        assert!(out.extension.is_none());
    }

    #[tokio::test]
    async fn vision_redactor_decodes_service_output() {
        async fn anonymize(mut form: Multipart) -> Json<serde_json::Value> {
            let field = form.next_field().await.unwrap().unwrap();
            assert_eq!(field.name(), Some("file"));
            assert_eq!(field.file_name(), Some("face.jpg"));
            let bytes = field.bytes().await.unwrap();
            assert_eq!(&bytes[..], b"original-pixels");

            Json(json!({
                "redacted_image_b64": BASE64_STANDARD.encode(b"blurred-pixels"),
                "entities": [{ "label": "face", "conf": 0.91, "bbox": [0.0, 0.0, 1.0, 1.0] }],
                "timing_ms": 12.5
            }))
        }

        let base = serve(Router::new().route("/v1/anonymize/image", post(anonymize))).await;
        let out = VisionRedactor::new(base).redact(&sample()).await.unwrap();
        assert_eq!(out.bytes, b"blurred-pixels");
        assert_eq!(out.extension, Some("png"));
    }

    #[tokio::test]
    async fn vision_redactor_surfaces_service_errors() {
        async fn reject() -> (StatusCode, &'static str) {
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported or corrupt image")
        }

        let base = serve(Router::new().route("/v1/anonymize/image", post(reject))).await;
        let err = VisionRedactor::new(base).redact(&sample()).await.unwrap_err();
        match err {
            RedactionError::Status { status, body } => {
                assert_eq!(status, 415);
                assert!(body.contains("corrupt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

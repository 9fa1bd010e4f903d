//! Hugging Face image-to-image client for virtual try-on overlays.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{InferenceError, OverlayGenerator};
use crate::config::InferenceConfig;

const PROVIDER: &str = "Hugging Face";
const DEFAULT_MIME_TYPE: &str = "image/png";

/// Generation parameters for an overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRequest {
    pub prompt: String,
    pub strength: f32,
    pub steps: u32,
    pub guidance_scale: f32,
}

impl Default for OverlayRequest {
    fn default() -> Self {
        Self {
            prompt: "realistic fashion overlay".to_owned(),
            strength: 0.7,
            steps: 20,
            guidance_scale: 7.5,
        }
    }
}

/// Binary image returned by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Overlay generator backed by the Hugging Face inference API.
#[derive(Clone)]
pub struct HuggingFaceRenderer {
    inner: Arc<HuggingFaceRendererInner>,
}

struct HuggingFaceRendererInner {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    endpoint: Url,
}

impl HuggingFaceRenderer {
    /// Create a new renderer client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HuggingFaceRendererInner {
                client,
                api_key: config.hf_api_key.clone(),
                endpoint: config.hf_model_url.clone(),
            }),
        })
    }
}

#[async_trait]
impl OverlayGenerator for HuggingFaceRenderer {
    #[instrument(skip(self, image, request), fields(endpoint = %self.inner.endpoint, bytes = image.len()))]
    async fn generate_overlay(
        &self,
        image: &[u8],
        request: &OverlayRequest,
    ) -> Result<GeneratedImage, InferenceError> {
        let api_key = self
            .inner
            .api_key
            .as_ref()
            .ok_or(InferenceError::MissingCredential("HF_API_KEY"))?;

        let encoded = STANDARD.encode(image);
        let payload = OverlayPayload::new(&encoded, request);

        let response = self
            .inner
            .client
            .post(self.inner.endpoint.clone())
            .bearer_auth(api_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        let generated = classify_response(status, content_type.as_deref(), &body)?;
        debug!(
            mime_type = %generated.mime_type,
            bytes = generated.bytes.len(),
            "Generated overlay image"
        );
        Ok(generated)
    }
}

/// Interpret a raw response from the image endpoint.
///
/// The service only answers with JSON when something went wrong, so a JSON
/// content type is an error regardless of status.
///
/// # Errors
///
/// - `Api` for non-success statuses, carrying the JSON body when parseable and
///   the status reason otherwise
/// - `Service` when a JSON body carries an `error` field
/// - `UnexpectedPayload` for any other JSON body
/// - `InvalidResponse` for an empty image body
pub fn classify_response(
    status: StatusCode,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<GeneratedImage, InferenceError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(body).map_or_else(
            |_| status.canonical_reason().unwrap_or_default().to_owned(),
            |value| value.to_string(),
        );
        return Err(InferenceError::Api {
            provider: PROVIDER,
            status: status.as_u16(),
            message,
        });
    }

    let content_type = content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE);

    if content_type.contains("application/json") {
        let error = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|value| value.get("error").cloned());
        return Err(match error {
            Some(Value::String(message)) => InferenceError::Service {
                provider: PROVIDER,
                message,
            },
            Some(Value::Null) | None => InferenceError::UnexpectedPayload,
            Some(other) => InferenceError::Service {
                provider: PROVIDER,
                message: other.to_string(),
            },
        });
    }

    if body.is_empty() {
        return Err(InferenceError::InvalidResponse(
            "Hugging Face returned an empty image".to_owned(),
        ));
    }

    let mime_type = content_type
        .split(';')
        .next()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .trim()
        .to_owned();

    Ok(GeneratedImage {
        bytes: body.to_vec(),
        mime_type,
    })
}

#[derive(Serialize)]
struct OverlayPayload<'a> {
    inputs: &'a str,
    parameters: OverlayParameters<'a>,
}

#[derive(Serialize)]
struct OverlayParameters<'a> {
    prompt: &'a str,
    strength: f32,
    num_inference_steps: u32,
    guidance_scale: f32,
}

impl<'a> OverlayPayload<'a> {
    fn new(encoded_image: &'a str, request: &'a OverlayRequest) -> Self {
        Self {
            inputs: encoded_image,
            parameters: OverlayParameters {
                prompt: &request.prompt,
                strength: request.strength,
                num_inference_steps: request.steps,
                guidance_scale: request.guidance_scale,
            },
        }
    }
}

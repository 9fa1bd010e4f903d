//! `OpenAI` chat completions client used to pick outfit products.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use aistylehub_core::{ProductId, ProductType};

use super::{CatalogEntry, InferenceError, OutfitRecommender};
use crate::config::InferenceConfig;

const PROVIDER: &str = "OpenAI";
const TEMPERATURE: f32 = 0.7;

/// Outfit recommender backed by the `OpenAI` chat completions API.
///
/// Runs in JSON mode and expects an object with a `productIds` array.
#[derive(Clone)]
pub struct OpenAiStylist {
    inner: Arc<OpenAiStylistInner>,
}

struct OpenAiStylistInner {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    endpoint: String,
    model: String,
}

impl OpenAiStylist {
    /// Create a new stylist client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let endpoint = format!(
            "{}/chat/completions",
            config.openai_base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            inner: Arc::new(OpenAiStylistInner {
                client,
                api_key: config.openai_api_key.clone(),
                endpoint,
                model: config.openai_model.clone(),
            }),
        })
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> InferenceError {
        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or_else(|_| {
                    if body.trim().is_empty() {
                        status.canonical_reason().unwrap_or_default().to_owned()
                    } else {
                        body
                    }
                }),
            Err(e) => return InferenceError::Http(e),
        };

        InferenceError::Api {
            provider: PROVIDER,
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl OutfitRecommender for OpenAiStylist {
    #[instrument(skip(self, catalog), fields(model = %self.inner.model, catalog = catalog.len()))]
    async fn recommend_product_ids(
        &self,
        style: &str,
        catalog: &[CatalogEntry<'_>],
        max_items: usize,
    ) -> Result<Vec<ProductId>, InferenceError> {
        let api_key = self
            .inner
            .api_key
            .as_ref()
            .ok_or(InferenceError::MissingCredential("OPENAI_API_KEY"))?;

        let system = system_prompt(max_items);
        let user = user_prompt(style, catalog)?;
        let request = ChatRequest {
            model: &self.inner.model,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: TEMPERATURE,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let completion: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            InferenceError::InvalidResponse(format!("Failed to parse OpenAI response: {e}"))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);

        let ids = parse_recommendation(content.as_deref(), max_items)?;
        debug!(count = ids.len(), "Stylist returned product ids");
        Ok(ids)
    }
}

/// Instruction constraining the model to a `productIds` JSON object.
fn system_prompt(max_items: usize) -> String {
    let dress_order = ProductType::DRESS_ORDER
        .iter()
        .map(ProductType::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a fashion stylist for AIStyleHub. Recommend cohesive outfits from the \
         provided product catalog. Respond strictly with a JSON object that contains a \
         \"productIds\" property whose value is an array of catalog product IDs sorted in \
         dress order ({dress_order}). Select between 3 and {max_items} distinct items \
         covering tops, bottoms or dresses, accessories, and footwear when possible. Only \
         return IDs that exist in the catalog."
    )
}

fn user_prompt(style: &str, catalog: &[CatalogEntry<'_>]) -> Result<String, InferenceError> {
    let catalog = serde_json::to_string(catalog)?;
    Ok(format!(
        "Recommend an outfit for style: {style}.\nCatalog: {catalog}"
    ))
}

/// Extract product ids from the model's message content.
///
/// Ids may be integers, integral floats or numeric strings; anything else is
/// dropped. Duplicates keep their first position and the result is truncated to
/// `max_items`.
///
/// # Errors
///
/// Fails on missing or empty content, content that is not JSON, or a missing
/// `productIds` array.
pub fn parse_recommendation(
    content: Option<&str>,
    max_items: usize,
) -> Result<Vec<ProductId>, InferenceError> {
    let raw = content
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            InferenceError::InvalidResponse("OpenAI response did not include content".to_owned())
        })?;

    let parsed: Value = serde_json::from_str(raw).map_err(|_| {
        InferenceError::InvalidResponse("Failed to parse OpenAI JSON response".to_owned())
    })?;

    let ids = parsed
        .get("productIds")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            InferenceError::InvalidResponse("OpenAI response missing productIds array".to_owned())
        })?;

    let mut selected: Vec<ProductId> = Vec::with_capacity(max_items);
    for id in ids.iter().filter_map(product_id_from_value) {
        if selected.len() == max_items {
            break;
        }
        if !selected.contains(&id) {
            selected.push(id);
        }
    }

    Ok(selected)
}

#[allow(clippy::cast_possible_truncation)]
fn product_id_from_value(value: &Value) -> Option<ProductId> {
    let number = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => return i32::try_from(i).ok().map(ProductId::new),
            None => n.as_f64()?,
        },
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    let integral = number.is_finite() && number.fract() == 0.0;
    let in_range = (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&number);
    (integral && in_range).then(|| ProductId::new(number as i32))
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Error body returned by the `OpenAI` API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i32]) -> Vec<ProductId> {
        raw.iter().copied().map(ProductId::new).collect()
    }

    #[test]
    fn test_parse_plain_ids() {
        let parsed = parse_recommendation(Some(r#"{"productIds":[2,1,4]}"#), 5).expect("parse");
        assert_eq!(parsed, ids(&[2, 1, 4]));
    }

    #[test]
    fn test_parse_dedupes_and_truncates() {
        let raw = r#"{"productIds":[3,3,"5",1,5,8,9,10]}"#;
        let parsed = parse_recommendation(Some(raw), 5).expect("parse");
        assert_eq!(parsed, ids(&[3, 5, 1, 8, 9]));
    }

    #[test]
    fn test_parse_drops_non_numeric_ids() {
        let raw = r#"{"productIds":["abc",null,2.5,true,{"id":1},"7",6.0]}"#;
        let parsed = parse_recommendation(Some(raw), 5).expect("parse");
        assert_eq!(parsed, ids(&[7, 6]));
    }

    #[test]
    fn test_parse_empty_array_is_ok() {
        let parsed = parse_recommendation(Some(r#"{"productIds":[]}"#), 5).expect("parse");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_content() {
        for content in [None, Some(""), Some("   ")] {
            let err = parse_recommendation(content, 5).unwrap_err();
            assert_eq!(err.to_string(), "OpenAI response did not include content");
        }
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_recommendation(Some("Here is your outfit: 1, 2, 3"), 5).unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse OpenAI JSON response");
    }

    #[test]
    fn test_parse_rejects_missing_array() {
        for raw in [r#"{"ids":[1]}"#, r#"{"productIds":"1,2"}"#, "[1,2,3]"] {
            let err = parse_recommendation(Some(raw), 5).unwrap_err();
            assert_eq!(err.to_string(), "OpenAI response missing productIds array");
        }
    }

    #[test]
    fn test_system_prompt_mentions_bounds_and_order() {
        let prompt = system_prompt(5);
        assert!(prompt.contains("between 3 and 5 distinct items"));
        assert!(prompt.contains("top, dress, bottom, outerwear, accessory, footwear"));
        assert!(prompt.contains("\"productIds\""));
    }

    #[test]
    fn test_user_prompt_embeds_catalog() {
        let product = crate::models::product::fixtures::product(1, ProductType::Top, &["office"]);
        let prompt = user_prompt("minimalist office", &[CatalogEntry::from(&product)]).expect("prompt");

        assert!(prompt.starts_with("Recommend an outfit for style: minimalist office.\nCatalog: ["));
        assert!(prompt.contains(r#""styleTags":["office"]"#));
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: TEMPERATURE,
            messages: [
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
        };

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_request() {
        let config = InferenceConfig::for_tests();
        let stylist = OpenAiStylist::new(&config).expect("client");

        let err = stylist
            .recommend_product_ids("office", &[], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::MissingCredential("OPENAI_API_KEY")));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let mut config = InferenceConfig::for_tests();
        config.openai_base_url = url::Url::parse("https://llm.internal/v1/").expect("url");
        let stylist = OpenAiStylist::new(&config).expect("client");
        assert_eq!(stylist.inner.endpoint, "https://llm.internal/v1/chat/completions");
    }
}

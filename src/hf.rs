//! Hugging Face inference API clients (text completion and image
//! generation) over a blocking HTTP client.

use reqwest::blocking::Client as HttpClient;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{MaquetteError, MaquetteResult};
use crate::upstream::{ImageGeneration, ImageRequest, ImageResponse, RetryReason, TextCompletion};

fn build_http(cfg: &Config) -> MaquetteResult<HttpClient> {
    HttpClient::builder()
        .timeout(cfg.request_timeout)
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| MaquetteError::upstream(format!("http client build failed: {e}")))
}

/// Text-completion client against `{api_base}/{model}`.
pub struct HfTextClient {
    http: HttpClient,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl HfTextClient {
    pub fn from_config(cfg: &Config) -> MaquetteResult<Self> {
        Ok(Self {
            http: build_http(cfg)?,
            api_base: cfg.api_base.clone(),
            api_key: cfg.huggingface_api_key.clone(),
            model: cfg.text_model.clone(),
        })
    }
}

impl TextCompletion for HfTextClient {
    fn complete(&self, input: &str) -> MaquetteResult<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(MaquetteError::upstream("HUGGINGFACE_API_KEY not set"));
        };

        let url = format!("{}/{}", self.api_base, self.model);
        let payload = json!({
            "inputs": input,
            "parameters": {
                "max_length": 150,
                "temperature": 0.9,
                "top_p": 0.9,
                "do_sample": true,
                "return_full_text": false
            }
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .map_err(|e| MaquetteError::upstream(format!("text inference request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| MaquetteError::upstream(format!("text inference body read failed: {e}")))?;
        if !status.is_success() {
            return Err(MaquetteError::upstream(format!(
                "text inference failed ({}): {}",
                status.as_u16(),
                truncate(&body, 256)
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| MaquetteError::serde(format!("text inference returned invalid JSON: {e}")))?;
        let generated = parsed
            .get(0)
            .and_then(|v| v.get("generated_text"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| MaquetteError::upstream("text inference payload missing generated_text"))?;

        debug!(model = %self.model, "text completion ok");
        Ok(generated.trim().to_string())
    }
}

/// Image-generation client. Infallible by signature: status codes and
/// transport failures are folded into the three-outcome response the
/// orchestrator consumes.
pub struct HfImageClient {
    http: HttpClient,
    api_base: String,
    api_key: Option<String>,
}

impl HfImageClient {
    pub fn from_config(cfg: &Config) -> MaquetteResult<Self> {
        Ok(Self {
            http: build_http(cfg)?,
            api_base: cfg.api_base.clone(),
            api_key: cfg.huggingface_api_key.clone(),
        })
    }
}

impl ImageGeneration for HfImageClient {
    fn generate(&self, model: &str, req: &ImageRequest) -> ImageResponse {
        let Some(api_key) = self.api_key.as_deref() else {
            return ImageResponse::Fatal("HUGGINGFACE_API_KEY not set".to_string());
        };

        let url = format!("{}/{}", self.api_base, model);
        let payload = json!({
            "inputs": req.prompt,
            "parameters": {
                "negative_prompt": req.negative_prompt,
                "num_inference_steps": req.num_inference_steps,
                "guidance_scale": req.guidance_scale,
                "width": req.width,
                "height": req.height
            }
        });

        let resp = match self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(model, error = %e, "image inference transport failure");
                return ImageResponse::Retryable(RetryReason::Transport(e.to_string()));
            }
        };

        let status = resp.status();
        if status.as_u16() == 503 {
            return ImageResponse::Retryable(RetryReason::ModelLoading);
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return ImageResponse::Fatal(format!(
                "image inference failed ({}): {}",
                status.as_u16(),
                truncate(&body, 256)
            ));
        }

        match resp.bytes() {
            Ok(bytes) => ImageResponse::Bytes(bytes.to_vec()),
            Err(e) => ImageResponse::Retryable(RetryReason::Transport(e.to_string())),
        }
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "..."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_caps_long_bodies() {
        let long = "x".repeat(400);
        let t = truncate(&long, 256);
        assert!(t.chars().count() <= 259);
        assert!(t.ends_with("..."));
        assert_eq!(truncate("short", 256), "short");
    }

    #[test]
    fn missing_api_key_is_fatal_not_retryable() {
        let cfg = Config::default();
        let client = HfImageClient::from_config(&cfg).unwrap();
        let req = ImageRequest::new("p", 64, 64);
        match client.generate("some/model", &req) {
            ImageResponse::Fatal(msg) => assert!(msg.contains("HUGGINGFACE_API_KEY")),
            other => panic!("expected fatal, got {other:?}"),
        }
    }
}

//! Vector similarity search against a Qdrant-style points/search endpoint.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::Client as HttpClient;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{MaquetteError, MaquetteResult};
use crate::upstream::{SimilarDesign, VectorSearch};

const QUERY_VECTOR_DIM: usize = 128;
const SEARCH_LIMIT: usize = 5;

pub struct QdrantSearch {
    http: HttpClient,
    base_url: String,
    api_key: String,
    collection: String,
}

impl QdrantSearch {
    /// `None` when the search collaborator is not configured; callers treat
    /// that as "no similar designs", not an error.
    pub fn from_config(cfg: &Config) -> MaquetteResult<Option<Self>> {
        let (Some(base_url), Some(api_key)) = (cfg.qdrant_url.clone(), cfg.qdrant_api_key.clone())
        else {
            return Ok(None);
        };
        let http = HttpClient::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| MaquetteError::upstream(format!("http client build failed: {e}")))?;
        Ok(Some(Self {
            http,
            base_url,
            api_key,
            collection: cfg.qdrant_collection.clone(),
        }))
    }
}

impl VectorSearch for QdrantSearch {
    fn find_similar(&self, query: &str) -> MaquetteResult<Vec<SimilarDesign>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let payload = json!({
            "vector": query_vector(query),
            "limit": SEARCH_LIMIT,
            "with_payload": true,
            "with_vectors": false
        });

        let resp = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .map_err(|e| MaquetteError::upstream(format!("vector search request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| MaquetteError::upstream(format!("vector search body read failed: {e}")))?;
        if !status.is_success() {
            return Err(MaquetteError::upstream(format!(
                "vector search failed ({})",
                status.as_u16()
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| MaquetteError::serde(format!("vector search returned invalid JSON: {e}")))?;
        let items = parsed
            .get("result")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let results = items.iter().map(parse_hit).collect::<Vec<_>>();
        debug!(query, hits = results.len(), "vector search ok");
        Ok(results)
    }
}

fn parse_hit(item: &serde_json::Value) -> SimilarDesign {
    let payload = item.get("payload").cloned().unwrap_or(serde_json::Value::Null);
    let url = payload
        .get("image_url")
        .and_then(|v| v.as_str())
        .unwrap_or("#")
        .to_string();
    let score = item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let image_bytes = payload
        .get("image_data")
        .and_then(|v| v.as_str())
        .and_then(|b64| match BASE64.decode(b64) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "search payload carried undecodable image data");
                None
            }
        });
    SimilarDesign {
        url,
        score: score.clamp(0.0, 100.0),
        payload,
        image_bytes,
    }
}

/// Deterministic stand-in embedding: bytes of a SHA-256 digest cycled over
/// the vector width and centered around zero.
fn query_vector(text: &str) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    (0..QUERY_VECTOR_DIM)
        .map(|i| f32::from(digest[i % digest.len()]) / 255.0 - 0.5)
        .collect()
}

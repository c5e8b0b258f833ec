//! Persistent object/metadata store client (Supabase-style storage plus a
//! REST metadata table).

use reqwest::blocking::Client as HttpClient;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{MaquetteError, MaquetteResult};
use crate::model::DesignMeta;
use crate::upstream::ObjectStore;

pub struct HttpObjectStore {
    http: HttpClient,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl HttpObjectStore {
    /// `None` when the storage collaborator is not configured.
    pub fn from_config(cfg: &Config) -> MaquetteResult<Option<Self>> {
        let (Some(base_url), Some(api_key)) = (cfg.storage_url.clone(), cfg.storage_api_key.clone())
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
            bucket: cfg.storage_bucket.clone(),
        }))
    }
}

impl ObjectStore for HttpObjectStore {
    fn put(&self, bytes: &[u8], meta: &DesignMeta) -> MaquetteResult<String> {
        let object_id = uuid::Uuid::new_v4().to_string();
        let object_url = format!(
            "{}/storage/v1/object/{}/{}.png",
            self.base_url, self.bucket, object_id
        );

        let resp = self
            .http
            .post(&object_url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .map_err(|e| MaquetteError::upstream(format!("object upload failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(MaquetteError::upstream(format!(
                "object upload failed ({})",
                resp.status().as_u16()
            )));
        }

        // Metadata row is best-effort: the object is already durable.
        let meta_url = format!("{}/rest/v1/designs", self.base_url);
        match self
            .http
            .post(&meta_url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "object_id": object_id,
                "metadata": meta,
            }))
            .send()
        {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => warn!(status = resp.status().as_u16(), "metadata row insert failed"),
            Err(e) => warn!(error = %e, "metadata row insert failed"),
        }

        debug!(%object_id, "design stored");
        Ok(object_id)
    }

    fn get(&self, id: &str, format: &str) -> MaquetteResult<Vec<u8>> {
        let url = format!(
            "{}/storage/v1/object/public/{}/{}.{}",
            self.base_url, self.bucket, id, format
        );
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| MaquetteError::upstream(format!("object download failed: {e}")))?;

        if resp.status().as_u16() == 404 {
            return Err(MaquetteError::not_found(format!("object '{id}'")));
        }
        if !resp.status().is_success() {
            return Err(MaquetteError::upstream(format!(
                "object download failed ({})",
                resp.status().as_u16()
            )));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| MaquetteError::upstream(format!("object body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

//! HTTP client for the metadata endpoints.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::models::{
    MetadataKeyDto, SessionKeyBundleDto, SessionKeyBundleUpload, UpdateMetadataPrivateKeyRequest,
};
use crate::api::{ApiError, ApiResult, MetadataApi};
use crate::auth::MfaProvider;

/// Standard response envelope used by the backend.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    body: T,
}

/// Body of an MFA-required rejection, listing accepted providers.
#[derive(Debug, Deserialize)]
struct MfaRequiredBody {
    #[serde(default)]
    mfa_providers: Vec<String>,
}

/// HTTP client for the KeyHaven backend.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session_token: String,
}

impl ApiClient {
    /// Create a new API client for the given server and session.
    pub fn new(base_url: &str, session_token: &str) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: session_token.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.session_token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let resp = Self::classify(resp).await?;
        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(envelope.body)
    }

    async fn send_json<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> ApiResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .request(method, &url)
            .bearer_auth(&self.session_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Self::classify(resp).await?;
        Ok(())
    }

    /// Map backend rejections onto the error taxonomy the engines use.
    async fn classify(resp: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        match status.as_u16() {
            401 => Err(ApiError::Unauthorized),
            403 => {
                let providers = resp
                    .json::<Envelope<MfaRequiredBody>>()
                    .await
                    .map(|e| {
                        e.body
                            .mfa_providers
                            .iter()
                            .filter_map(|p| MfaProvider::parse(p))
                            .collect()
                    })
                    .unwrap_or_default();
                Err(ApiError::MfaRequired(providers))
            }
            409 => Err(ApiError::Conflict),
            code => {
                let message = resp.text().await.unwrap_or_else(|_| "unknown".to_string());
                Err(ApiError::Http {
                    status: code,
                    message,
                })
            }
        }
    }
}

impl MetadataApi for ApiClient {
    async fn fetch_metadata_keys(&self) -> ApiResult<Vec<MetadataKeyDto>> {
        self.get_json("/metadata/keys.json?contain%5Bmetadata_private_keys%5D=1")
            .await
    }

    async fn update_metadata_private_key(&self, id: Uuid, data: &str) -> ApiResult<()> {
        let request = UpdateMetadataPrivateKeyRequest {
            id,
            data: data.to_string(),
        };
        self.send_json(
            reqwest::Method::PUT,
            &format!("/metadata/keys/private/{}.json", id),
            &request,
        )
        .await
    }

    async fn fetch_session_key_bundles(&self) -> ApiResult<Vec<SessionKeyBundleDto>> {
        self.get_json("/metadata/session-keys.json").await
    }

    async fn post_session_key_bundle(&self, data: &str) -> ApiResult<()> {
        let upload = SessionKeyBundleUpload {
            data: data.to_string(),
        };
        self.send_json(reqwest::Method::POST, "/metadata/session-keys.json", &upload)
            .await
    }

    async fn update_session_key_bundle(
        &self,
        id: Uuid,
        last_modified: DateTime<Utc>,
        data: &str,
    ) -> ApiResult<()> {
        let upload = SessionKeyBundleUpload {
            data: data.to_string(),
        };
        self.send_json(
            reqwest::Method::PUT,
            &format!(
                "/metadata/session-keys/{}.json?modified={}",
                id,
                last_modified.to_rfc3339()
            ),
            &upload,
        )
        .await
    }
}

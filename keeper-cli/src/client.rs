use anyhow::{anyhow, Context};
use reqwest::Response;
use secrets_keeper_types::{
    CreateSecretRequest, CreateSecretResponse, ErrorResponse, RetrieveSecretRequest,
    RetrieveSecretResponse,
};
use serde::de::DeserializeOwned;
use tracing::debug;

const SECRETS_PATH: &str = "/api/secrets";

/// HTTP client for a Secrets Keeper server.
pub struct KeeperClient {
    pub base_url: String,
    http: reqwest::Client,
}

impl KeeperClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Link a recipient can pass to the `retrieve` subcommand.
    pub fn share_url(&self, token: &str) -> String {
        format!("{}{}/{}", self.base_url, SECRETS_PATH, token)
    }

    pub async fn create(&self, req: &CreateSecretRequest) -> anyhow::Result<CreateSecretResponse> {
        let url = format!("{}{}", self.base_url, SECRETS_PATH);
        debug!(ttl = req.ttl, "Creating secret");
        let resp = self
            .http
            .post(&url)
            .json(req)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;
        decode(resp).await
    }

    pub async fn retrieve(
        &self,
        token: &str,
        passphrase: Option<String>,
    ) -> anyhow::Result<RetrieveSecretResponse> {
        let url = self.share_url(token);
        let resp = self
            .http
            .post(&url)
            .json(&RetrieveSecretRequest { passphrase })
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> anyhow::Result<T> {
    let status = resp.status();
    if status.is_success() {
        return resp.json().await.context("Malformed server response");
    }

    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => Err(anyhow!("{} ({})", err.error, err.code)),
        Err(_) => Err(anyhow!("Server returned {}", status)),
    }
}

/// Split a share URL into its server base and token. A bare token has no server.
pub fn parse_share_target(input: &str) -> (Option<String>, String) {
    let input = input.trim().trim_end_matches('/');
    match input.rsplit_once(&format!("{}/", SECRETS_PATH)) {
        Some((base, token)) if input.contains("://") => {
            (Some(base.to_string()), token.to_string())
        }
        _ => (None, input.to_string()),
    }
}

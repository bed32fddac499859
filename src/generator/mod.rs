//! Client for the external NPC / encounter / treasure generator.
//!
//! The generator is a separate HTTP service; handlers only depend on the
//! [`GeneratorService`] trait so tests can swap in a fake.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const MAGIC_ITEM_CATEGORIES: [&str; 9] = [
    "armor", "weapons", "potions", "rings", "rods", "scrolls", "staves", "wands", "wondrous",
];

/// Longest error body kept from a failed response.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator unavailable: {0}")]
    Transient(String),
    #[error("generator rejected the request ({status}): {body}")]
    Invalid { status: u16, body: String },
    #[error("generator misconfigured: {0}")]
    Config(String),
}

impl GeneratorError {
    /// 4xx means our request was wrong; anything else may go away on retry.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let body: String = body.chars().take(MAX_ERROR_BODY).collect();
        if status.is_client_error() {
            GeneratorError::Invalid {
                status: status.as_u16(),
                body,
            }
        } else {
            GeneratorError::Transient(format!("status {status}: {body}"))
        }
    }
}

impl From<reqwest::Error> for GeneratorError {
    fn from(err: reqwest::Error) -> Self {
        GeneratorError::Transient(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcRequest {
    pub level: i32,
    pub attributes_method: String,
    #[serde(default)]
    pub manual: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterRequest {
    pub player_level: i32,
    pub player_count: i32,
    pub difficulty: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasureRequest {
    pub level: i32,
    pub coin_type: String,
    pub valuable_type: String,
    pub item_type: String,
    pub more_random_coins: bool,
    pub trade: String,
    pub gems: bool,
    pub art_objects: bool,
    pub magic_items: bool,
    pub psionic_items: bool,
    pub chaositech_items: bool,
    pub magic_item_categories: Vec<String>,
    pub ranks: Vec<String>,
    pub max_value: i32,
    pub combine_hoards: bool,
    pub quantity: i32,
}

impl TreasureRequest {
    /// Categories only make sense with magic items on; none selected means all.
    pub fn normalized(mut self) -> Self {
        if !self.magic_items {
            self.magic_item_categories.clear();
        } else if self.magic_item_categories.is_empty() {
            self.magic_item_categories = MAGIC_ITEM_CATEGORIES.iter().map(|c| c.to_string()).collect();
        }
        self
    }
}

#[async_trait]
pub trait GeneratorService: Send + Sync {
    async fn health(&self) -> Result<(), GeneratorError>;
    async fn generate_npc(&self, req: &NpcRequest) -> Result<Value, GeneratorError>;
    async fn generate_encounter(&self, req: &EncounterRequest) -> Result<Value, GeneratorError>;
    async fn generate_treasure(&self, req: &TreasureRequest) -> Result<Value, GeneratorError>;
}

/// `reqwest`-backed generator client with its own connection pool.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: Client,
    base_url: Url,
}

impl HttpGenerator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GeneratorError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| GeneratorError::Config(format!("invalid base url '{base_url}': {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::Config(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GeneratorError> {
        self.base_url
            .join(path)
            .map_err(|e| GeneratorError::Config(format!("bad endpoint '{path}': {e}")))
    }

    async fn read(response: reqwest::Response) -> Result<Value, GeneratorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::from_status(status, body));
        }
        Ok(response.json::<Value>().await?)
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<Value, GeneratorError> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }
}

#[async_trait]
impl GeneratorService for HttpGenerator {
    async fn health(&self) -> Result<(), GeneratorError> {
        let response = self.client.get(self.endpoint("/health")?).send().await?;
        let body = Self::read(response).await?;
        match body.get("status").and_then(Value::as_str) {
            Some("healthy") => Ok(()),
            other => Err(GeneratorError::Transient(format!(
                "unhealthy service status: {}",
                other.unwrap_or("missing")
            ))),
        }
    }

    async fn generate_npc(&self, req: &NpcRequest) -> Result<Value, GeneratorError> {
        self.post("/generate-npc", req).await
    }

    async fn generate_encounter(&self, req: &EncounterRequest) -> Result<Value, GeneratorError> {
        self.post("/generate-encounter", req).await
    }

    async fn generate_treasure(&self, req: &TreasureRequest) -> Result<Value, GeneratorError> {
        let req = req.clone().normalized();
        self.post("/generate-loot", &req).await
    }
}

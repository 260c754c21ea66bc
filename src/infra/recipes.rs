//! Asynchronous client for the recipe REST API.
//!
//! - Lists, fetches, creates, updates and deletes recipes.
//! - Keeps the recipe listing in memory for a configurable TTL and serves the
//!   last copy when a refresh fails.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{Material, MaterialType, Recipe, RecipeDraft, RecipeId};
use crate::util::version::user_agent;

pub const DEFAULT_BASE_URL: &str = "https://apiraitocraft.onrender.com/api/";
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
const DELETED_MESSAGE: &str = "Recipe deleted";

#[derive(Debug, Error)]
pub enum RecipeClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid recipe id: {0}")]
    InvalidId(RecipeId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Clone, Debug)]
pub struct CachedPayload<T> {
    pub data: T,
    pub fetched_at: SystemTime,
    pub status: CacheStatus,
}

impl<T> CachedPayload<T> {
    fn new(data: T, fetched_at: SystemTime, status: CacheStatus) -> Self {
        Self {
            data,
            fetched_at,
            status,
        }
    }
}

/// Server reply to a write.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id: Option<RecipeId>,
}

#[derive(Default)]
struct RecipeCache {
    items: Option<Cached<Vec<Recipe>>>,
}

#[derive(Clone)]
pub struct RecipeClient {
    http: Client,
    base_url: Url,
    cache: Arc<Mutex<RecipeCache>>,
    ttl: Duration,
}

impl RecipeClient {
    pub fn new() -> Result<Self, RecipeClientError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base: &str) -> Result<Self, RecipeClientError> {
        let base_url = Url::parse(&with_trailing_slash(base))?;
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            base_url,
            cache: Arc::new(Mutex::new(RecipeCache::default())),
            ttl: DEFAULT_TTL,
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Every recipe, materials included.
    pub async fn fetch_items(&self) -> Result<CachedPayload<Vec<Recipe>>, RecipeClientError> {
        if let Some(payload) = self.cached_items().await {
            debug!(count = payload.data.len(), "serving cached recipe listing");
            return Ok(payload);
        }

        let url = self.url("items")?;
        match self.fetch::<Vec<RecipeDto>>(self.http.get(url)).await {
            Ok(dtos) => {
                let data: Vec<Recipe> = dtos.into_iter().map(Recipe::from).collect();
                info!(count = data.len(), "loaded recipe listing");
                Ok(self.store_items(data).await)
            }
            Err(error) => {
                if let Some(stale) = self.cached_items_stale().await {
                    warn!(%error, "recipe listing refresh failed, serving stale copy");
                    return Ok(stale);
                }
                Err(error)
            }
        }
    }

    /// A single recipe, or `None` when the server does not know the id.
    pub async fn fetch_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RecipeClientError> {
        if id == 0 {
            return Ok(None);
        }

        let url = self.url(&format!("items/{id}/recipe"))?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(id, "recipe not found");
            return Ok(None);
        }

        let dto: RecipeDto = decode(response).await?;
        Ok(Some(Recipe::from(dto)))
    }

    pub async fn create_item(&self, draft: &RecipeDraft) -> Result<WriteAck, RecipeClientError> {
        let url = self.url("items")?;
        let ack = self.fetch(self.http.post(url).json(draft)).await?;
        self.invalidate().await;
        info!(name = %draft.name, "created recipe");
        Ok(ack)
    }

    pub async fn update_item(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
    ) -> Result<WriteAck, RecipeClientError> {
        if id == 0 {
            return Err(RecipeClientError::InvalidId(id));
        }

        let url = self.url(&format!("items/{id}"))?;
        let ack = self.fetch(self.http.put(url).json(draft)).await?;
        self.invalidate().await;
        info!(id, "updated recipe");
        Ok(ack)
    }

    pub async fn delete_item(&self, id: RecipeId) -> Result<WriteAck, RecipeClientError> {
        if id == 0 {
            return Err(RecipeClientError::InvalidId(id));
        }

        let url = self.url(&format!("items/{id}"))?;
        let response = self.http.delete(url).send().await?;
        let ack = if response.status() == StatusCode::NO_CONTENT {
            WriteAck {
                message: Some(DELETED_MESSAGE.to_string()),
                id: Some(id),
            }
        } else {
            decode(response).await?
        };
        self.invalidate().await;
        info!(id, "deleted recipe");
        Ok(ack)
    }

    pub async fn clear_cache(&self) {
        self.invalidate().await;
    }

    async fn invalidate(&self) {
        self.cache.lock().await.items = None;
    }

    async fn cached_items(&self) -> Option<CachedPayload<Vec<Recipe>>> {
        let cache = self.cache.lock().await;
        cache
            .items
            .as_ref()
            .and_then(|entry| entry.if_fresh(self.ttl))
    }

    async fn cached_items_stale(&self) -> Option<CachedPayload<Vec<Recipe>>> {
        let cache = self.cache.lock().await;
        cache.items.as_ref().map(Cached::stale)
    }

    async fn store_items(&self, data: Vec<Recipe>) -> CachedPayload<Vec<Recipe>> {
        let fetched_at = SystemTime::now();
        let payload = CachedPayload::new(data.clone(), fetched_at, CacheStatus::Fresh);
        self.cache.lock().await.items = Some(Cached::new(data, fetched_at));
        payload
    }

    async fn fetch<T>(&self, builder: reqwest::RequestBuilder) -> Result<T, RecipeClientError>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await?;
        decode(response).await
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

/// Read a response body as JSON or text and turn non-2xx replies into
/// [`RecipeClientError::Api`].
async fn decode<T>(response: Response) -> Result<T, RecipeClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value.contains("application/json"));

    let body = if is_json {
        response.json::<Value>().await?
    } else {
        Value::String(response.text().await?)
    };

    if !status.is_success() {
        return Err(RecipeClientError::Api {
            status,
            message: error_message(&body, status),
        });
    }

    Ok(serde_json::from_value(body)?)
}

fn error_message(body: &Value, status: StatusCode) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    };

    match body {
        Value::Object(map) => match map.get("error") {
            Some(Value::String(message)) if !message.is_empty() => message.clone(),
            Some(Value::Null) | None => body.to_string(),
            Some(other) => other.to_string(),
        },
        Value::String(text) if !text.trim().is_empty() => text.clone(),
        Value::String(_) | Value::Null => fallback(),
        other => other.to_string(),
    }
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}

struct Cached<T> {
    value: T,
    fetched_at: SystemTime,
}

impl<T: Clone> Cached<T> {
    fn new(value: T, fetched_at: SystemTime) -> Self {
        Self { value, fetched_at }
    }

    fn if_fresh(&self, ttl: Duration) -> Option<CachedPayload<T>> {
        if self
            .fetched_at
            .elapsed()
            .map(|elapsed| elapsed <= ttl)
            .unwrap_or(false)
        {
            Some(CachedPayload::new(
                self.value.clone(),
                self.fetched_at,
                CacheStatus::Cached,
            ))
        } else {
            None
        }
    }

    fn stale(&self) -> CachedPayload<T> {
        CachedPayload::new(self.value.clone(), self.fetched_at, CacheStatus::Stale)
    }
}

#[derive(Debug, Deserialize)]
struct RecipeDto {
    #[serde(deserialize_with = "i64_from_json")]
    id: i64,
    name: String,
    #[serde(default, deserialize_with = "optional_f64_from_json")]
    quantity_produced: Option<f64>,
    #[serde(default, deserialize_with = "optional_f64_from_json")]
    npc_sell_price: Option<f64>,
    #[serde(default)]
    materials: Option<Vec<MaterialDto>>,
}

impl From<RecipeDto> for Recipe {
    fn from(dto: RecipeDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            quantity_produced: dto.quantity_produced.map(whole_units).unwrap_or(1),
            npc_sell_price: dto.npc_sell_price.unwrap_or(0.0),
            materials: dto
                .materials
                .unwrap_or_default()
                .into_iter()
                .map(Material::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MaterialDto {
    material_name: String,
    #[serde(deserialize_with = "f64_from_json")]
    quantity: f64,
    material_type: MaterialType,
    #[serde(default, deserialize_with = "optional_f64_from_json")]
    default_npc_price: Option<f64>,
}

impl From<MaterialDto> for Material {
    fn from(dto: MaterialDto) -> Self {
        Self {
            material_name: dto.material_name,
            quantity: whole_units(dto.quantity),
            material_type: dto.material_type,
            default_npc_price: dto.default_npc_price.unwrap_or(0.0),
        }
    }
}

fn whole_units(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.trunc().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Numeric columns arrive either as JSON numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn parse<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Number(value) => Ok(value),
            NumberOrString::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid number: {text}"))),
        }
    }
}

fn f64_from_json<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?.parse()
}

fn optional_f64_from_json<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::parse)
        .transpose()
}

fn i64_from_json<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64_from_json(deserializer)?;
    let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&value);
    if in_range && value.fract() == 0.0 {
        Ok(value as i64)
    } else {
        Err(serde::de::Error::custom(format!("invalid id: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_dto_rejects_non_integer_ids() {
        for id in [serde_json::json!(4.5), serde_json::json!("7.25"), serde_json::json!(1e30)] {
            let json = serde_json::json!({ "id": id, "name": "Bronze Ring" });
            assert!(serde_json::from_value::<RecipeDto>(json).is_err());
        }

        let json = serde_json::json!({ "id": "12", "name": "Bronze Ring" });
        let recipe = Recipe::from(serde_json::from_value::<RecipeDto>(json).unwrap());
        assert_eq!(recipe.id, 12);
    }

    #[test]
    fn recipe_dto_accepts_decimal_strings() {
        let json = serde_json::json!({
            "id": "4",
            "name": "Bronze Ring",
            "quantity_produced": 2,
            "npc_sell_price": "150.50",
            "materials": [
                {"material_name": "Copper", "quantity": "3", "material_type": "buy", "default_npc_price": null},
                {"material_name": "Polish", "quantity": 1, "material_type": "profession"}
            ]
        });
        let recipe = Recipe::from(serde_json::from_value::<RecipeDto>(json).unwrap());
        assert_eq!(recipe.id, 4);
        assert_eq!(recipe.quantity_produced, 2);
        assert_eq!(recipe.npc_sell_price, 150.5);
        assert_eq!(recipe.materials[0].quantity, 3);
        assert_eq!(recipe.materials[0].default_npc_price, 0.0);
        assert_eq!(recipe.materials[1].material_type, MaterialType::Profession);
    }

    #[test]
    fn recipe_without_materials_decodes_empty() {
        let json = serde_json::json!({"id": 9, "name": "Stub"});
        let recipe = Recipe::from(serde_json::from_value::<RecipeDto>(json).unwrap());
        assert!(recipe.materials.is_empty());
        assert_eq!(recipe.quantity_produced, 1);
    }

    #[test]
    fn error_message_prefers_error_field() {
        let body = serde_json::json!({"error": "name already exists"});
        assert_eq!(
            error_message(&body, StatusCode::CONFLICT),
            "name already exists"
        );
        assert_eq!(
            error_message(&Value::String("boom".into()), StatusCode::BAD_GATEWAY),
            "boom"
        );
        assert_eq!(
            error_message(&Value::String(String::new()), StatusCode::BAD_GATEWAY),
            "Bad Gateway"
        );
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = RecipeClient::with_base_url("http://localhost:3000/api").unwrap();
        assert_eq!(
            client.url("items").unwrap().as_str(),
            "http://localhost:3000/api/items"
        );
    }
}

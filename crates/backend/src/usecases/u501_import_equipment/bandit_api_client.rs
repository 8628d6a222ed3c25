use crate::shared::config::BanditApiConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Ошибки обращения к Bandit API.
///
/// Наружу не выходят: клиент логирует их и возвращает пустой результат.
#[derive(Debug, Error)]
pub enum BanditApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("Malformed payload from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Категория каталога Bandit (`project_category`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanditCategory {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: i64,
}

/// Медиа-файл каталога Bandit (`media/<id>`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: i64,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub mime_type: String,
}

/// Продукт каталога Bandit: типизированный вид нужных полей плюс исходный JSON
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalProduct {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub link: String,
    pub category_ids: Vec<i64>,
    /// Полный ответ API, от него считается хэш
    pub raw: Value,
}

impl ExternalProduct {
    /// Разобрать ответ API; None, если это не объект с положительным `id`
    pub fn from_value(raw: Value) -> Option<Self> {
        let object = raw.as_object()?;
        let id = object.get("id").and_then(as_i64).filter(|id| *id > 0)?;

        let category_ids = object
            .get("project_category")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(as_i64).collect())
            .unwrap_or_default();
        let link = object
            .get("link")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let title = acf_text(&raw, "product_main_title").unwrap_or_default();
        let content = acf_text(&raw, "product_description").unwrap_or_default();

        Some(Self {
            id,
            title,
            content,
            link,
            category_ids,
            raw,
        })
    }

    /// Поле блока `acf` как есть
    pub fn acf(&self, key: &str) -> Option<&Value> {
        self.raw.get("acf").and_then(|acf| acf.get(key))
    }

    /// Скалярное поле `acf` строкой; пустые значения и `false` считаются отсутствующими
    pub fn acf_text(&self, key: &str) -> Option<String> {
        acf_text(&self.raw, key)
    }
}

fn acf_text(raw: &Value, key: &str) -> Option<String> {
    let value = raw.get("acf")?.get(key)?;
    scalar_text(value)
}

/// Строка или число строкой; всё остальное (null, false, объекты) - отсутствие
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Источник данных каталога для конвейера импорта.
///
/// Все операции "мягкие": сбой сети или неожиданный ответ дают пустой результат.
#[async_trait]
pub trait EquipmentSource: Send + Sync {
    async fn list_categories(&self) -> Vec<BanditCategory>;

    async fn list_products_by_category(&self, category_id: i64) -> Vec<ExternalProduct>;

    async fn get_product(&self, product_id: i64) -> Option<ExternalProduct>;

    async fn get_category(&self, category_id: i64) -> Option<BanditCategory>;

    async fn get_media(&self, media_id: i64) -> Option<MediaInfo>;
}

/// Весь каталог: категории в порядке API и продукты каждой из них
pub async fn fetch_all(source: &dyn EquipmentSource) -> Vec<(BanditCategory, Vec<ExternalProduct>)> {
    let mut listing = Vec::new();
    for category in source.list_categories().await {
        let products = source.list_products_by_category(category.id).await;
        listing.push((category, products));
    }
    listing
}

/// HTTP-клиент для WordPress REST API сайта Bandit
pub struct BanditApiClient {
    client: reqwest::Client,
    base_url: String,
    per_page: u32,
}

impl BanditApiClient {
    pub fn new(config: &BanditApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            per_page: config.per_page.max(1),
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route)
    }

    /// Один объект; пустой объект или массив вместо объекта - ошибка формата
    async fn fetch_object(&self, route: &str) -> Result<Value, BanditApiError> {
        let url = self.url(route);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BanditApiError::Status { status, url });
        }

        let body: Value = response.json().await.map_err(|e| BanditApiError::Malformed {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        match body.as_object() {
            Some(object) if !object.is_empty() => Ok(body),
            _ => Err(BanditApiError::Malformed {
                url,
                reason: "expected a non-empty object".to_string(),
            }),
        }
    }

    /// Одна страница коллекции и общее число страниц из `X-WP-TotalPages`
    async fn fetch_page(
        &self,
        route: &str,
        query: &[(&str, String)],
        page: u32,
    ) -> Result<(Vec<Value>, Option<u32>), BanditApiError> {
        let url = self.url(route);
        tracing::debug!("GET {} page {}", url, page);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("per_page", self.per_page), ("page", page)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BanditApiError::Status { status, url });
        }

        let total_pages = response
            .headers()
            .get("X-WP-TotalPages")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());

        let body: Value = response.json().await.map_err(|e| BanditApiError::Malformed {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        match body {
            Value::Array(items) => Ok((items, total_pages)),
            _ => Err(BanditApiError::Malformed {
                url,
                reason: "expected an array".to_string(),
            }),
        }
    }

    /// Все страницы коллекции. Сбой страницы завершает выборку тем, что уже собрано
    async fn fetch_list(&self, route: &str, query: &[(&str, String)]) -> Vec<Value> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            match self.fetch_page(route, query, page).await {
                Ok((batch, total_pages)) => {
                    let batch_len = batch.len();
                    items.extend(batch);

                    let last_page = match total_pages {
                        Some(total) => page >= total,
                        None => batch_len < self.per_page as usize,
                    };
                    if last_page || batch_len == 0 {
                        break;
                    }
                    page += 1;
                }
                Err(e) => {
                    tracing::warn!("Bandit API listing '{}' stopped at page {}: {}", route, page, e);
                    break;
                }
            }
        }

        items
    }

    async fn fetch_single(&self, route: &str) -> Option<Value> {
        match self.fetch_object(route).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Bandit API request '{}' failed: {}", route, e);
                None
            }
        }
    }
}

#[async_trait]
impl EquipmentSource for BanditApiClient {
    async fn list_categories(&self) -> Vec<BanditCategory> {
        self.fetch_list("project_category", &[])
            .await
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    async fn list_products_by_category(&self, category_id: i64) -> Vec<ExternalProduct> {
        self.fetch_list("project", &[("project_category", category_id.to_string())])
            .await
            .into_iter()
            .filter_map(ExternalProduct::from_value)
            .collect()
    }

    async fn get_product(&self, product_id: i64) -> Option<ExternalProduct> {
        let raw = self.fetch_single(&format!("project/{}", product_id)).await?;
        ExternalProduct::from_value(raw)
    }

    async fn get_category(&self, category_id: i64) -> Option<BanditCategory> {
        let raw = self
            .fetch_single(&format!("project_category/{}", category_id))
            .await?;
        serde_json::from_value(raw).ok()
    }

    async fn get_media(&self, media_id: i64) -> Option<MediaInfo> {
        let raw = self.fetch_single(&format!("media/{}", media_id)).await?;
        serde_json::from_value(raw).ok()
    }
}

//! In-process catalog used by the pipeline tests in place of the Bandit API.

use super::bandit_api_client::{BanditCategory, EquipmentSource, ExternalProduct, MediaInfo};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct StubSource {
    categories: Vec<BanditCategory>,
    products: Mutex<Vec<Value>>,
    media: BTreeMap<i64, String>,
    media_calls: AtomicUsize,
    listing_calls: AtomicUsize,
}

impl StubSource {
    pub fn with_category(mut self, id: i64, name: &str) -> Self {
        self.categories.push(BanditCategory {
            id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: String::new(),
            parent: 0,
        });
        self
    }

    pub fn with_product(mut self, raw: Value) -> Self {
        self.products.get_mut().unwrap().push(raw);
        self
    }

    pub fn with_media(mut self, id: i64, url: &str) -> Self {
        self.media.insert(id, url.to_string());
        self
    }

    /// Swap the payload of an already registered product (same `id`)
    pub fn replace_product(&self, raw: Value) {
        let mut products = self.products.lock().unwrap();
        products.retain(|p| p["id"] != raw["id"]);
        products.push(raw);
    }

    pub fn media_calls(&self) -> usize {
        self.media_calls.load(Ordering::SeqCst)
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EquipmentSource for StubSource {
    async fn list_categories(&self) -> Vec<BanditCategory> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        self.categories.clone()
    }

    async fn list_products_by_category(&self, category_id: i64) -> Vec<ExternalProduct> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        self.products
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .filter_map(ExternalProduct::from_value)
            .filter(|p| p.category_ids.contains(&category_id))
            .collect()
    }

    async fn get_product(&self, product_id: i64) -> Option<ExternalProduct> {
        let products = self.products.lock().unwrap();
        let raw = products.iter().find(|p| p["id"] == product_id)?;
        ExternalProduct::from_value(raw.clone())
    }

    async fn get_category(&self, category_id: i64) -> Option<BanditCategory> {
        self.categories.iter().find(|c| c.id == category_id).cloned()
    }

    async fn get_media(&self, media_id: i64) -> Option<MediaInfo> {
        self.media_calls.fetch_add(1, Ordering::SeqCst);
        self.media.get(&media_id).map(|url| MediaInfo {
            id: media_id,
            source_url: url.clone(),
            mime_type: String::new(),
        })
    }
}

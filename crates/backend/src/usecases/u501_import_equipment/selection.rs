use super::bandit_api_client::{fetch_all, EquipmentSource, ExternalProduct};
use crate::shared::data::options;
use contracts::usecases::u501_import_equipment::CatalogProduct;
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const SELECTED_PRODUCTS_OPTION: &str = "bandit_selected_products";
pub const CACHED_LISTING_OPTION: &str = "bandit_cached_listing";
pub const CACHED_IMAGES_OPTION: &str = "bandit_cached_images";

/// Каталог для выбора: имя категории -> продукты
pub type CatalogListing = BTreeMap<String, Vec<CatalogProduct>>;

/// Выбранные для импорта ID продуктов в сохранённом порядке
pub async fn selected_ids(db: &DatabaseConnection) -> anyhow::Result<Vec<i64>> {
    let stored: Vec<i64> = options::get(db, SELECTED_PRODUCTS_OPTION)
        .await?
        .unwrap_or_default();
    Ok(normalize_selection(&stored))
}

/// Сохранить выбор: порядок сохраняется, повторы и неположительные ID отбрасываются
pub async fn save_selection(db: &DatabaseConnection, ids: &[i64]) -> anyhow::Result<Vec<i64>> {
    let selection = normalize_selection(ids);
    options::set(db, SELECTED_PRODUCTS_OPTION, &selection).await?;
    tracing::info!("Saved selection of {} products", selection.len());
    Ok(selection)
}

fn normalize_selection(ids: &[i64]) -> Vec<i64> {
    let mut result: Vec<i64> = Vec::with_capacity(ids.len());
    for id in ids {
        if *id > 0 && !result.contains(id) {
            result.push(*id);
        }
    }
    result
}

/// Кэшированный каталог Bandit и URL картинок для экрана выбора
pub struct CatalogService {
    db: DatabaseConnection,
    source: Arc<dyn EquipmentSource>,
}

impl CatalogService {
    pub fn new(db: DatabaseConnection, source: Arc<dyn EquipmentSource>) -> Self {
        Self { db, source }
    }

    /// Каталог из кэша; перечитывается из API, если кэш пуст или запрошено обновление.
    ///
    /// Пустой ответ API кэш не затирает.
    pub async fn catalog(&self, refresh: bool) -> anyhow::Result<CatalogListing> {
        let cached: Option<CatalogListing> = options::get(&self.db, CACHED_LISTING_OPTION).await?;

        let mut listing = match cached {
            Some(listing) if !refresh && !listing.is_empty() => listing,
            cached => {
                let fetched = self.fetch_listing().await;
                if fetched.is_empty() {
                    tracing::warn!("Bandit catalog came back empty, keeping the cached listing");
                    cached.unwrap_or_default()
                } else {
                    options::set(&self.db, CACHED_LISTING_OPTION, &fetched).await?;
                    fetched
                }
            }
        };

        let selected = selected_ids(&self.db).await?;
        for products in listing.values_mut() {
            for product in products.iter_mut() {
                product.selected = selected.contains(&product.id);
                if let Some(media_ref) = product.first_image_ref.clone() {
                    product.first_image_url = self.media_url(&media_ref).await?;
                }
            }
        }
        Ok(listing)
    }

    /// URL медиа по ID из кэша; промах запрашивается в API и запоминается
    pub async fn media_url(&self, media_ref: &str) -> anyhow::Result<Option<String>> {
        let mut cache: BTreeMap<String, String> = options::get(&self.db, CACHED_IMAGES_OPTION)
            .await?
            .unwrap_or_default();
        if let Some(url) = cache.get(media_ref) {
            return Ok(Some(url.clone()));
        }

        let Ok(media_id) = media_ref.trim().parse::<i64>() else {
            return Ok(None);
        };
        let Some(media) = self.source.get_media(media_id).await else {
            return Ok(None);
        };
        if media.source_url.is_empty() {
            return Ok(None);
        }

        cache.insert(media_ref.to_string(), media.source_url.clone());
        options::set(&self.db, CACHED_IMAGES_OPTION, &cache).await?;
        Ok(Some(media.source_url))
    }

    async fn fetch_listing(&self) -> CatalogListing {
        let mut listing = CatalogListing::new();
        for (category, products) in fetch_all(self.source.as_ref()).await {
            let entry = listing.entry(category.name).or_default();
            for product in products {
                if !entry.iter().any(|p| p.id == product.id) {
                    entry.push(to_catalog_product(&product));
                }
            }
        }
        listing
    }
}

fn to_catalog_product(product: &ExternalProduct) -> CatalogProduct {
    CatalogProduct {
        id: product.id,
        title: product.title.clone(),
        link: product.link.clone(),
        first_image_ref: product.acf_text("product_image_carousel_1"),
        first_image_url: None,
        selected: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::test_connection;
    use crate::usecases::u501_import_equipment::test_support::StubSource;
    use serde_json::json;

    #[tokio::test]
    async fn selection_keeps_order_and_drops_duplicates() {
        let db = test_connection().await;
        assert!(selected_ids(&db).await.unwrap().is_empty());

        let saved = save_selection(&db, &[30, 10, 30, 0, 20, 10]).await.unwrap();
        assert_eq!(saved, vec![30, 10, 20]);
        assert_eq!(selected_ids(&db).await.unwrap(), vec![30, 10, 20]);
    }

    fn source() -> Arc<StubSource> {
        Arc::new(
            StubSource::default()
                .with_category(7, "Hand-Fed Chippers")
                .with_product(json!({ "id": 1, "project_category": [7],
                                      "acf": { "product_main_title": "65XP", "product_image_carousel_1": 501 } }))
                .with_product(json!({ "id": 2, "project_category": [7],
                                      "acf": { "product_main_title": "90XP" } }))
                .with_media(501, "https://cdn.example/65xp.jpg"),
        )
    }

    #[tokio::test]
    async fn catalog_is_cached_and_marks_selection() {
        let db = test_connection().await;
        let source = source();
        let service = CatalogService::new(db.clone(), source.clone());
        save_selection(&db, &[2]).await.unwrap();

        let listing = service.catalog(false).await.unwrap();
        let products = &listing["Hand-Fed Chippers"];
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].first_image_url.as_deref(), Some("https://cdn.example/65xp.jpg"));
        assert!(!products[0].selected);
        assert!(products[1].selected);
        let listing_calls = source.listing_calls();

        // cached listing and cached image url: no further API traffic
        service.catalog(false).await.unwrap();
        assert_eq!(source.listing_calls(), listing_calls);
        assert_eq!(source.media_calls(), 1);

        service.catalog(true).await.unwrap();
        assert!(source.listing_calls() > listing_calls);
    }

    #[tokio::test]
    async fn empty_refresh_keeps_previous_listing() {
        let db = test_connection().await;
        CatalogService::new(db.clone(), source()).catalog(false).await.unwrap();

        let offline = CatalogService::new(db.clone(), Arc::new(StubSource::default()));
        let listing = offline.catalog(true).await.unwrap();
        assert_eq!(listing["Hand-Fed Chippers"].len(), 2);
    }

    #[tokio::test]
    async fn media_url_ignores_non_numeric_refs() {
        let db = test_connection().await;
        let service = CatalogService::new(db, source());
        assert_eq!(service.media_url("not-an-id").await.unwrap(), None);
        assert_eq!(service.media_url("404").await.unwrap(), None);
    }
}

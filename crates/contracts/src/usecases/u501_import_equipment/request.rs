use serde::{Deserialize, Serialize};

/// Сохранение выбора продуктов для импорта (порядок значим)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub product_ids: Vec<i64>,
}

/// Параметры запроса каталога
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Принудительно перечитать каталог из API вместо кэша
    #[serde(default)]
    pub refresh: bool,
}

/// Краткая карточка продукта в каталоге для выбора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: i64,
    pub title: String,
    pub link: String,
    /// ID первого изображения галереи, если есть
    pub first_image_ref: Option<String>,
    /// URL первого изображения из кэша медиа
    pub first_image_url: Option<String>,
    pub selected: bool,
}

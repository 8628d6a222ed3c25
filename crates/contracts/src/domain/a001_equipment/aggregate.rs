use crate::domain::a002_equipment_family::aggregate::{EquipmentFamily, EquipmentFamilyId};
use crate::domain::common::{AggregateId, AggregateRoot, EntityMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ID типа для единицы техники (локальный ключ записи)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentId(pub i64);

impl EquipmentId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl AggregateId for EquipmentId {
    fn from_string(s: &str) -> Result<Self, String> {
        <i64 as AggregateId>::from_string(s).map(EquipmentId::new)
    }
}

/// Тип медиа-вложения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Изображение галереи
    Image,
    /// Документ (PDF со спецификацией)
    Document,
    /// Видео (ссылка YouTube)
    Video,
}

/// Медиа-вложение единицы техники
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Поле фида, из которого взята ссылка (например, "product_image_carousel_1")
    pub slot: String,
    pub kind: MediaKind,
    /// Значение из фида: ID медиа в Bandit или URL видео
    pub source_ref: String,
    /// URL, по которому медиа доступно локально; None, пока не разрешено
    pub resolved_url: Option<String>,
}

/// Значение произвольного атрибута записи
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    /// Таблица "метка -> значение" (например, технические характеристики)
    Table(BTreeMap<String, String>),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            MetaValue::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            MetaValue::Table(t) => Some(t),
            MetaValue::Text(_) => None,
        }
    }
}

/// Единица техники (агрегат a001), нормализованная запись из фида Bandit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    /// Локальный ID; None до первого сохранения, далее не меняется
    pub local_id: Option<EquipmentId>,

    /// ID продукта в каталоге Bandit, уникален среди локальных записей
    pub external_id: i64,

    /// Тип записи в хранилище (например, "bandit_equipment")
    pub post_type: String,

    pub title: String,
    pub content: String,

    /// Произвольные атрибуты (sub_title, custom_product_description, featured_details, ...)
    pub meta_fields: BTreeMap<String, MetaValue>,

    /// Медиа в порядке полей фида
    pub media_items: Vec<MediaItem>,

    /// Семейства техники; без повторов по ID
    pub families: Vec<EquipmentFamily>,

    /// Хэш всего исходного JSON продукта, ключ идемпотентности
    pub content_hash: String,

    pub metadata: EntityMetadata,
}

impl Equipment {
    pub fn new_from_feed(
        external_id: i64,
        post_type: String,
        title: String,
        content: String,
        content_hash: String,
    ) -> Self {
        Self {
            local_id: None,
            external_id,
            post_type,
            title,
            content,
            meta_fields: BTreeMap::new(),
            media_items: Vec::new(),
            families: Vec::new(),
            content_hash,
            metadata: EntityMetadata::new(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.local_id.is_none()
    }

    /// Заменить набор семейств целиком, отбрасывая повторы по ID
    pub fn set_families(&mut self, families: Vec<EquipmentFamily>) {
        let mut unique: Vec<EquipmentFamily> = Vec::with_capacity(families.len());
        for family in families {
            if !unique.iter().any(|f| f.id == family.id) {
                unique.push(family);
            }
        }
        self.families = unique;
    }

    pub fn family_ids(&self) -> Vec<EquipmentFamilyId> {
        self.families.iter().map(|f| f.id).collect()
    }

    pub fn media_of_kind(&self, kind: MediaKind) -> impl Iterator<Item = &MediaItem> {
        self.media_items.iter().filter(move |m| m.kind == kind)
    }

    pub fn meta_text(&self, key: &str) -> Option<&str> {
        self.meta_fields.get(key).and_then(MetaValue::as_text)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.external_id <= 0 {
            return Err(format!("Invalid external id: {}", self.external_id));
        }
        if self.content_hash.trim().is_empty() {
            return Err("Content hash must not be empty".into());
        }
        Ok(())
    }
}

impl AggregateRoot for Equipment {
    fn aggregate_index() -> &'static str {
        "a001"
    }

    fn collection_name() -> &'static str {
        "equipment"
    }
}

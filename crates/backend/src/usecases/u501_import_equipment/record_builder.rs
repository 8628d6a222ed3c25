use super::bandit_api_client::{scalar_text, ExternalProduct};
use crate::domain::a001_equipment;
use contracts::domain::a001_equipment::aggregate::{Equipment, MediaItem, MediaKind, MetaValue};
use sea_orm::DatabaseConnection;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const META_BANDIT_LINK: &str = "bandit_link";
pub const META_SUB_TITLE: &str = "sub_title";
pub const META_FEATURES: &str = "custom_product_description";
pub const META_DETAILS: &str = "featured_details";

const FEATURES_FIELD: &str = "key_features_&_options";
const DETAILS_FIELD: &str = "product_details";

/// Поля `acf` с медиа, в порядке вывода
const MEDIA_SLOTS: [(&str, MediaKind); 10] = [
    ("product_image_carousel_1", MediaKind::Image),
    ("product_image_carousel_2", MediaKind::Image),
    ("product_image_carousel_3", MediaKind::Image),
    ("product_image_carousel_4", MediaKind::Image),
    ("product_image_carousel_5", MediaKind::Image),
    ("product_image_carousel_6", MediaKind::Image),
    ("product_specs", MediaKind::Document),
    ("video_1", MediaKind::Video),
    ("video_2", MediaKind::Video),
    ("video_3", MediaKind::Video),
];

/// Запись, готовая к сохранению, и хэш уже сохранённой версии (если есть)
#[derive(Debug, Clone)]
pub struct PreparedRecord {
    pub record: Equipment,
    pub stored_hash: Option<String>,
}

impl PreparedRecord {
    /// Исходный JSON не менялся с прошлого сохранения
    pub fn is_unchanged(&self) -> bool {
        self.stored_hash.as_deref() == Some(self.record.content_hash.as_str())
    }
}

/// Построение нормализованной записи из продукта Bandit
pub struct RecordBuilder {
    db: DatabaseConnection,
    post_type: String,
}

impl RecordBuilder {
    pub fn new(db: DatabaseConnection, post_type: impl Into<String>) -> Self {
        Self {
            db,
            post_type: post_type.into(),
        }
    }

    /// Нормализовать продукт и перенести локальный ID существующей записи
    pub async fn build(&self, product: &ExternalProduct) -> anyhow::Result<PreparedRecord> {
        let mut record = normalize(product, &self.post_type)?;

        let stored = a001_equipment::service::stored_state(&self.db, product.id).await?;
        let stored_hash = stored.map(|state| {
            record.local_id = Some(state.id);
            record.metadata = state.metadata;
            state.content_hash
        });

        Ok(PreparedRecord { record, stored_hash })
    }
}

/// Чистое преобразование продукта в запись (без семейств и без разрешённых URL)
pub fn normalize(product: &ExternalProduct, post_type: &str) -> anyhow::Result<Equipment> {
    let mut record = Equipment::new_from_feed(
        product.id,
        post_type.to_string(),
        product.title.clone(),
        product.content.clone(),
        content_hash(&product.raw)?,
    );

    if !product.link.is_empty() {
        record
            .meta_fields
            .insert(META_BANDIT_LINK.into(), MetaValue::Text(product.link.clone()));
    }
    if let Some(sub_title) = product.acf_text("product_sub_title") {
        record
            .meta_fields
            .insert(META_SUB_TITLE.into(), MetaValue::Text(sub_title));
    }
    if let Some(features) = product.acf(FEATURES_FIELD).and_then(render_features) {
        record
            .meta_fields
            .insert(META_FEATURES.into(), MetaValue::Text(features));
    }
    if let Some(details) = product.acf(DETAILS_FIELD).and_then(spec_table) {
        record
            .meta_fields
            .insert(META_DETAILS.into(), MetaValue::Table(details));
    }

    for (slot, kind) in MEDIA_SLOTS {
        let Some(source_ref) = product.acf_text(slot) else {
            continue;
        };
        let resolved_url = match kind {
            MediaKind::Video => Some(source_ref.clone()),
            MediaKind::Image | MediaKind::Document => None,
        };
        record.media_items.push(MediaItem {
            slot: slot.to_string(),
            kind,
            source_ref,
            resolved_url,
        });
    }

    Ok(record)
}

/// SHA-256 (hex) канонической сериализации всего JSON продукта
pub fn content_hash(raw: &Value) -> anyhow::Result<String> {
    let bytes = serde_json::to_vec(&Canonical(raw))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Сериализация с ключами объектов в лексикографическом порядке
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &Canonical(value))?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&Canonical(item))?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}

/// Список особенностей в `<ul><li>..</li></ul>`; пустые пункты пропускаются
fn render_features(value: &Value) -> Option<String> {
    let items: Vec<String> = match value {
        Value::Object(map) => map.values().filter_map(scalar_text).collect(),
        Value::Array(list) => list.iter().filter_map(scalar_text).collect(),
        _ => return None,
    };
    if items.is_empty() {
        return None;
    }

    let html: String = items.iter().map(|item| format!("<li>{}</li>", item)).collect();
    Some(sanitize_html(&format!("<ul>{}</ul>", html)))
}

/// Санитизация HTML списка особенностей: только разметка текста и ссылки
fn sanitize_html(html: &str) -> String {
    ammonia::Builder::new()
        .tags(maplit::hashset![
            "ul", "ol", "li", "p", "br", "strong", "em", "b", "i", "u", "span", "a", "sup", "sub",
        ])
        .generic_attributes(maplit::hashset!["class", "title"])
        .clean(html)
        .to_string()
}

/// Таблица характеристик "метка -> значение" без пустых значений
fn spec_table(value: &Value) -> Option<BTreeMap<String, String>> {
    let table: BTreeMap<String, String> = value
        .as_object()?
        .iter()
        .filter_map(|(label, v)| scalar_text(v).map(|text| (label.clone(), text)))
        .collect();
    if table.is_empty() {
        None
    } else {
        Some(table)
    }
}

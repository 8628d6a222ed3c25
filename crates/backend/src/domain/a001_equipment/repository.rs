use contracts::domain::a001_equipment::aggregate::{Equipment, EquipmentId, MediaItem, MetaValue};
use contracts::domain::common::EntityMetadata;
use sea_orm::entity::prelude::*;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a001_equipment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub external_id: i64,
    pub post_type: String,
    pub title: String,
    pub content: String,
    pub meta_json: String,
    pub media_json: String,
    pub content_hash: String,
    pub is_bandit_feed: bool,
    pub sort: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Порядок сортировки записей, пришедших из фида
pub const FEED_SORT_ORDER: i32 = 999;

/// Семейства не хранятся в этой таблице: их подставляет сервис по таблице связей
impl From<Model> for Equipment {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata::restored(m.created_at, m.updated_at, m.version);
        let meta_fields: BTreeMap<String, MetaValue> =
            serde_json::from_str(&m.meta_json).unwrap_or_else(|e| {
                tracing::warn!("Broken meta_json for equipment {}: {}", m.id, e);
                BTreeMap::new()
            });
        let media_items: Vec<MediaItem> = serde_json::from_str(&m.media_json).unwrap_or_else(|e| {
            tracing::warn!("Broken media_json for equipment {}: {}", m.id, e);
            Vec::new()
        });

        Equipment {
            local_id: Some(EquipmentId(m.id)),
            external_id: m.external_id,
            post_type: m.post_type,
            title: m.title,
            content: m.content,
            meta_fields,
            media_items,
            families: Vec::new(),
            content_hash: m.content_hash,
            metadata,
        }
    }
}

pub async fn get_by_id(db: &DatabaseConnection, id: EquipmentId) -> anyhow::Result<Option<Model>> {
    Ok(Entity::find_by_id(id.value()).one(db).await?)
}

pub async fn get_by_external_id(
    db: &DatabaseConnection,
    external_id: i64,
) -> anyhow::Result<Option<Model>> {
    Ok(Entity::find()
        .filter(Column::ExternalId.eq(external_id))
        .one(db)
        .await?)
}

/// Пагинированный список в порядке локальных ID
pub async fn list_paginated(
    db: &DatabaseConnection,
    limit: u64,
    offset: u64,
) -> anyhow::Result<(Vec<Model>, u64)> {
    let total = Entity::find().count(db).await?;
    let items = Entity::find()
        .order_by_asc(Column::Id)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok((items, total))
}

pub async fn count(db: &DatabaseConnection) -> anyhow::Result<u64> {
    Ok(Entity::find().count(db).await?)
}

pub async fn insert<C: ConnectionTrait>(db: &C, aggregate: &Equipment) -> anyhow::Result<EquipmentId> {
    let active = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        external_id: Set(aggregate.external_id),
        post_type: Set(aggregate.post_type.clone()),
        title: Set(aggregate.title.clone()),
        content: Set(aggregate.content.clone()),
        meta_json: Set(serde_json::to_string(&aggregate.meta_fields)?),
        media_json: Set(serde_json::to_string(&aggregate.media_items)?),
        content_hash: Set(aggregate.content_hash.clone()),
        is_bandit_feed: Set(true),
        sort: Set(FEED_SORT_ORDER),
        created_at: Set(Some(aggregate.metadata.created_at)),
        updated_at: Set(Some(aggregate.metadata.updated_at)),
        version: Set(aggregate.metadata.version),
    };
    let model = active.insert(db).await?;
    Ok(EquipmentId(model.id))
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: EquipmentId,
    aggregate: &Equipment,
) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(id.value()),
        external_id: Set(aggregate.external_id),
        post_type: Set(aggregate.post_type.clone()),
        title: Set(aggregate.title.clone()),
        content: Set(aggregate.content.clone()),
        meta_json: Set(serde_json::to_string(&aggregate.meta_fields)?),
        media_json: Set(serde_json::to_string(&aggregate.media_items)?),
        content_hash: Set(aggregate.content_hash.clone()),
        is_bandit_feed: Set(true),
        sort: Set(FEED_SORT_ORDER),
        created_at: sea_orm::ActiveValue::NotSet,
        updated_at: Set(Some(aggregate.metadata.updated_at)),
        version: Set(aggregate.metadata.version),
    };
    active.update(db).await?;
    Ok(())
}

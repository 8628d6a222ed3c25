use super::{family_link, repository};
use crate::domain::a002_equipment_family;
use contracts::domain::a001_equipment::aggregate::{Equipment, EquipmentId};
use contracts::domain::common::EntityMetadata;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};

/// Результат сохранения записи
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(EquipmentId),
    Updated(EquipmentId),
}

impl SaveOutcome {
    pub fn id(&self) -> EquipmentId {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Updated(id) => *id,
        }
    }
}

/// Сохранить запись: вставка новой или перезапись существующей на месте.
///
/// Локальный ID существующей записи не меняется, версия растёт на 1.
/// Набор семейств заменяется целиком. Запись и связи пишутся в одной транзакции:
/// при ошибке в БД остаётся прежний хэш.
pub async fn save(db: &DatabaseConnection, aggregate: &mut Equipment) -> anyhow::Result<SaveOutcome> {
    aggregate
        .validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    // Запись с тем же внешним ID уже могла появиться, даже если вызывающий её не нашёл
    if aggregate.local_id.is_none() {
        if let Some(existing) = repository::get_by_external_id(db, aggregate.external_id).await? {
            aggregate.local_id = Some(EquipmentId(existing.id));
            aggregate.metadata.created_at =
                existing.created_at.unwrap_or(aggregate.metadata.created_at);
            aggregate.metadata.version = existing.version;
        }
    }

    let txn = db.begin().await?;
    match write_record(&txn, aggregate).await {
        Ok(outcome) => {
            txn.commit().await?;
            Ok(outcome)
        }
        Err(e) => {
            txn.rollback().await?;
            Err(e)
        }
    }
}

async fn write_record<C: ConnectionTrait>(
    txn: &C,
    aggregate: &mut Equipment,
) -> anyhow::Result<SaveOutcome> {
    let outcome = match aggregate.local_id {
        None => {
            let id = repository::insert(txn, aggregate).await?;
            aggregate.local_id = Some(id);
            SaveOutcome::Created(id)
        }
        Some(id) => {
            aggregate.metadata.mark_rewritten();
            repository::update(txn, id, aggregate).await?;
            SaveOutcome::Updated(id)
        }
    };

    family_link::replace(txn, outcome.id(), &aggregate.family_ids()).await?;
    Ok(outcome)
}

/// Сохранённое состояние записи: ключ, хэш и метаданные
#[derive(Debug, Clone, PartialEq)]
pub struct StoredState {
    pub id: EquipmentId,
    pub content_hash: String,
    pub metadata: EntityMetadata,
}

/// Состояние записи по внешнему ID (без загрузки связей)
pub async fn stored_state(
    db: &DatabaseConnection,
    external_id: i64,
) -> anyhow::Result<Option<StoredState>> {
    let model = repository::get_by_external_id(db, external_id).await?;
    Ok(model.map(|m| {
        let id = EquipmentId(m.id);
        let content_hash = m.content_hash.clone();
        let metadata = Equipment::from(m).metadata;
        StoredState {
            id,
            content_hash,
            metadata,
        }
    }))
}

pub async fn get_by_id(db: &DatabaseConnection, id: EquipmentId) -> anyhow::Result<Option<Equipment>> {
    match repository::get_by_id(db, id).await? {
        Some(model) => Ok(Some(with_families(db, model.into()).await?)),
        None => Ok(None),
    }
}

pub async fn find_by_external_id(
    db: &DatabaseConnection,
    external_id: i64,
) -> anyhow::Result<Option<Equipment>> {
    match repository::get_by_external_id(db, external_id).await? {
        Some(model) => Ok(Some(with_families(db, model.into()).await?)),
        None => Ok(None),
    }
}

/// Пагинированный список с семействами
pub async fn list_paginated(
    db: &DatabaseConnection,
    limit: u64,
    offset: u64,
) -> anyhow::Result<(Vec<Equipment>, u64)> {
    let (models, total) = repository::list_paginated(db, limit, offset).await?;
    let mut items = Vec::with_capacity(models.len());
    for model in models {
        items.push(with_families(db, model.into()).await?);
    }
    Ok((items, total))
}

pub async fn count(db: &DatabaseConnection) -> anyhow::Result<u64> {
    repository::count(db).await
}

async fn with_families(db: &DatabaseConnection, mut aggregate: Equipment) -> anyhow::Result<Equipment> {
    let Some(id) = aggregate.local_id else {
        return Ok(aggregate);
    };
    let ids = family_link::families_of(db, id).await?;
    let mut found = a002_equipment_family::service::get_many(db, &ids).await?;
    // порядок назначения, а не порядок выборки
    found.sort_by_key(|f| ids.iter().position(|id| *id == f.id));
    aggregate.set_families(found);
    Ok(aggregate)
}

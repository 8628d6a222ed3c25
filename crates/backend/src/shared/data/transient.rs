//! Short-lived key/value state (`sys_transient`) with an expiry per row.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sys_transient")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value: String,
    pub expires_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Записать значение со сроком жизни `ttl`
pub async fn set<T: Serialize>(
    db: &DatabaseConnection,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let active = ActiveModel {
        key: Set(key.to_string()),
        value: Set(serde_json::to_string(value)?),
        expires_at: Set((Utc::now() + ttl).to_rfc3339()),
    };

    Entity::insert(active)
        .on_conflict(
            OnConflict::column(Column::Key)
                .update_columns([Column::Value, Column::ExpiresAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Прочитать значение; просроченная запись удаляется и читается как отсутствующая
pub async fn get<T: DeserializeOwned>(db: &DatabaseConnection, key: &str) -> Result<Option<T>> {
    get_at(db, key, Utc::now()).await
}

async fn get_at<T: DeserializeOwned>(
    db: &DatabaseConnection,
    key: &str,
    now: DateTime<Utc>,
) -> Result<Option<T>> {
    let Some(model) = Entity::find_by_id(key.to_string()).one(db).await? else {
        return Ok(None);
    };

    let expired = DateTime::parse_from_rfc3339(&model.expires_at)
        .map(|t| t.with_timezone(&Utc) <= now)
        .unwrap_or(true);
    if expired {
        Entity::delete_by_id(key.to_string()).exec(db).await?;
        return Ok(None);
    }

    Ok(serde_json::from_str(&model.value).ok())
}

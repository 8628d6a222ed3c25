//! Persisted key/value settings (`sys_option`), values stored as JSON.

use anyhow::Result;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sys_option")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Прочитать значение настройки.
///
/// Значение, которое не разбирается в ожидаемый тип, считается отсутствующим.
pub async fn get<T: DeserializeOwned>(db: &DatabaseConnection, key: &str) -> Result<Option<T>> {
    let Some(model) = Entity::find_by_id(key.to_string()).one(db).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&model.value) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Option '{}' has unexpected shape, ignoring: {}", key, e);
            Ok(None)
        }
    }
}

/// Записать значение настройки (insert или update)
pub async fn set<T: Serialize>(db: &DatabaseConnection, key: &str, value: &T) -> Result<()> {
    let active = ActiveModel {
        key: Set(key.to_string()),
        value: Set(serde_json::to_string(value)?),
        updated_at: Set(Utc::now().to_rfc3339()),
    };

    Entity::insert(active)
        .on_conflict(
            OnConflict::column(Column::Key)
                .update_columns([Column::Value, Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &DatabaseConnection, key: &str) -> Result<()> {
    Entity::delete_by_id(key.to_string()).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::test_connection;

    #[tokio::test]
    async fn set_then_overwrite() {
        let db = test_connection().await;
        assert_eq!(get::<Vec<i64>>(&db, "ids").await.unwrap(), None);

        set(&db, "ids", &vec![3i64, 1, 2]).await.unwrap();
        set(&db, "ids", &vec![7i64]).await.unwrap();
        assert_eq!(get::<Vec<i64>>(&db, "ids").await.unwrap(), Some(vec![7]));

        delete(&db, "ids").await.unwrap();
        assert_eq!(get::<Vec<i64>>(&db, "ids").await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_shape_reads_as_absent() {
        let db = test_connection().await;
        set(&db, "ids", &"not a list").await.unwrap();
        assert_eq!(get::<Vec<i64>>(&db, "ids").await.unwrap(), None);
    }
}

use super::repository;
use contracts::domain::a002_equipment_family::aggregate::{
    EquipmentFamily, EquipmentFamilyId, NewEquipmentFamily,
};
use sea_orm::DatabaseConnection;

/// Создание нового термина семейства
pub async fn create(
    db: &DatabaseConnection,
    new: NewEquipmentFamily,
) -> anyhow::Result<EquipmentFamily> {
    new.validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    let family = repository::insert(db, &new).await?;
    tracing::info!(
        "Created equipment family '{}' (id {}) in {}",
        family.name,
        family.id.value(),
        family.taxonomy
    );
    Ok(family)
}

/// Поиск термина по имени в таксономии
pub async fn find_by_name(
    db: &DatabaseConnection,
    taxonomy: &str,
    name: &str,
) -> anyhow::Result<Option<EquipmentFamily>> {
    repository::find_by_name(db, taxonomy, name).await
}

pub async fn get_many(
    db: &DatabaseConnection,
    ids: &[EquipmentFamilyId],
) -> anyhow::Result<Vec<EquipmentFamily>> {
    repository::get_many(db, ids).await
}

/// Список терминов (опционально только одной таксономии)
pub async fn list_all(
    db: &DatabaseConnection,
    taxonomy: Option<&str>,
) -> anyhow::Result<Vec<EquipmentFamily>> {
    repository::list_all(db, taxonomy).await
}

pub async fn count(db: &DatabaseConnection) -> anyhow::Result<u64> {
    repository::count(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::test_connection;

    fn new_family(taxonomy: &str, name: &str) -> NewEquipmentFamily {
        NewEquipmentFamily {
            external_category_id: Some(9),
            taxonomy: taxonomy.into(),
            name: name.into(),
            slug: "hand-fed-chippers".into(),
            description: "Hand-fed disc and drum chippers".into(),
            parent_id: 0,
        }
    }

    #[tokio::test]
    async fn create_then_find_by_exact_name() {
        let db = test_connection().await;
        let created = create(&db, new_family("bandit_equipment_family", "Hand-Fed Chippers"))
            .await
            .unwrap();
        assert!(created.id.value() > 0);

        let found = find_by_name(&db, "bandit_equipment_family", "Hand-Fed Chippers")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.external_category_id, Some(9));

        assert!(find_by_name(&db, "bandit_equipment_family", "hand-fed chippers")
            .await
            .unwrap()
            .is_none());
        assert!(find_by_name(&db, "other_taxonomy", "Hand-Fed Chippers")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_filters_by_taxonomy() {
        let db = test_connection().await;
        create(&db, new_family("bandit_equipment_family", "Stump Grinders")).await.unwrap();
        create(&db, new_family("other_taxonomy", "Stump Grinders")).await.unwrap();

        assert_eq!(count(&db).await.unwrap(), 2);
        let only = list_all(&db, Some("bandit_equipment_family")).await.unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].taxonomy, "bandit_equipment_family");
    }

    #[tokio::test]
    async fn blank_name_is_not_stored() {
        let db = test_connection().await;
        assert!(create(&db, new_family("bandit_equipment_family", " ")).await.is_err());
        assert_eq!(count(&db).await.unwrap(), 0);
    }
}

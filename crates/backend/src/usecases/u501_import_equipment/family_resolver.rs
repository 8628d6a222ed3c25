use super::bandit_api_client::EquipmentSource;
use crate::domain::a002_equipment_family;
use crate::shared::config::TaxonomyConfig;
use contracts::domain::a002_equipment_family::aggregate::{EquipmentFamily, NewEquipmentFamily};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Сопоставление категорий Bandit с локальными семействами техники.
///
/// Термин ищется по точному имени в таксономии и создаётся при первом
/// появлении. Переименование категории в Bandit существующий термин не меняет.
pub struct FamilyResolver {
    db: DatabaseConnection,
    source: Arc<dyn EquipmentSource>,
    taxonomy: String,
    parent_id: i64,
}

impl FamilyResolver {
    pub fn new(db: DatabaseConnection, source: Arc<dyn EquipmentSource>, config: &TaxonomyConfig) -> Self {
        Self {
            db,
            source,
            taxonomy: config.slug.clone(),
            parent_id: config.top_level_parent,
        }
    }

    /// Найти или создать термин для категории.
    ///
    /// None, если категорию не удалось получить из API.
    pub async fn resolve(&self, external_category_id: i64) -> anyhow::Result<Option<EquipmentFamily>> {
        let Some(category) = self.source.get_category(external_category_id).await else {
            tracing::warn!("Category {} is unavailable, skipping", external_category_id);
            return Ok(None);
        };
        if category.name.trim().is_empty() {
            tracing::warn!("Category {} has no name, skipping", external_category_id);
            return Ok(None);
        }

        if let Some(existing) =
            a002_equipment_family::service::find_by_name(&self.db, &self.taxonomy, &category.name).await?
        {
            return Ok(Some(existing));
        }

        let created = a002_equipment_family::service::create(
            &self.db,
            NewEquipmentFamily {
                external_category_id: Some(external_category_id),
                taxonomy: self.taxonomy.clone(),
                name: category.name,
                slug: category.slug,
                description: category.description,
                parent_id: self.parent_id,
            },
        )
        .await?;
        Ok(Some(created))
    }

    /// Разрешить набор категорий; без повторов, в порядке первого появления
    pub async fn resolve_all(&self, external_category_ids: &[i64]) -> anyhow::Result<Vec<EquipmentFamily>> {
        let mut families: Vec<EquipmentFamily> = Vec::new();
        for id in external_category_ids {
            if let Some(family) = self.resolve(*id).await? {
                if !families.iter().any(|f| f.id == family.id) {
                    families.push(family);
                }
            }
        }
        Ok(families)
    }
}

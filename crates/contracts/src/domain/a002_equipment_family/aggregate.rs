use crate::domain::common::{AggregateId, AggregateRoot, EntityMetadata};
use serde::{Deserialize, Serialize};

/// ID типа для термина таксономии "семейство техники"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentFamilyId(pub i64);

impl EquipmentFamilyId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl AggregateId for EquipmentFamilyId {
    fn from_string(s: &str) -> Result<Self, String> {
        <i64 as AggregateId>::from_string(s).map(EquipmentFamilyId::new)
    }
}

/// Семейство техники (агрегат a002), локальный термин таксономии.
///
/// Один термин на каждую внешнюю категорию Bandit. Имя уникально в пределах
/// таксономии: поиск существующего термина идёт по точному совпадению имени.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentFamily {
    pub id: EquipmentFamilyId,

    /// ID категории в каталоге Bandit (для обратного сопоставления)
    pub external_category_id: Option<i64>,

    /// Слаг таксономии, в которой живёт термин
    pub taxonomy: String,

    pub name: String,
    pub slug: String,
    pub description: String,

    /// Родительский термин, 0 = верхний уровень
    pub parent_id: i64,

    pub metadata: EntityMetadata,
}

/// Данные для создания нового термина (ID назначает хранилище)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEquipmentFamily {
    pub external_category_id: Option<i64>,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: i64,
}

impl NewEquipmentFamily {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Family name must not be empty".into());
        }
        if self.taxonomy.trim().is_empty() {
            return Err("Taxonomy slug must not be empty".into());
        }
        Ok(())
    }
}

impl AggregateRoot for EquipmentFamily {
    fn aggregate_index() -> &'static str {
        "a002"
    }

    fn collection_name() -> &'static str {
        "equipment_family"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_family(name: &str) -> NewEquipmentFamily {
        NewEquipmentFamily {
            external_category_id: Some(9),
            taxonomy: "bandit_equipment_family".into(),
            name: name.into(),
            slug: "hand-fed-chippers".into(),
            description: String::new(),
            parent_id: 0,
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(new_family("  ").validate().is_err());
        assert!(new_family("Hand-Fed Chippers").validate().is_ok());
    }

    #[test]
    fn full_name_matches_table_prefix() {
        assert_eq!(EquipmentFamily::full_name(), "a002_equipment_family");
    }
}

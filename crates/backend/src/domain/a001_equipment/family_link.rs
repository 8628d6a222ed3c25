//! Связь "единица техники - семейство" (многие ко многим)

use contracts::domain::a001_equipment::aggregate::EquipmentId;
use contracts::domain::a002_equipment_family::aggregate::EquipmentFamilyId;
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a001_equipment_family_link")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub equipment_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub family_id: i64,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// ID семейств записи в том порядке, в котором они были назначены
pub async fn families_of(
    db: &DatabaseConnection,
    equipment_id: EquipmentId,
) -> anyhow::Result<Vec<EquipmentFamilyId>> {
    let links = Entity::find()
        .filter(Column::EquipmentId.eq(equipment_id.value()))
        .order_by_asc(Column::Position)
        .all(db)
        .await?;
    Ok(links
        .into_iter()
        .map(|l| EquipmentFamilyId(l.family_id))
        .collect())
}

/// Заменить набор связей записи целиком
pub async fn replace<C: ConnectionTrait>(
    db: &C,
    equipment_id: EquipmentId,
    families: &[EquipmentFamilyId],
) -> anyhow::Result<()> {
    Entity::delete_many()
        .filter(Column::EquipmentId.eq(equipment_id.value()))
        .exec(db)
        .await?;

    // insert_many fails on an empty batch
    if families.is_empty() {
        return Ok(());
    }

    let rows = families.iter().enumerate().map(|(position, family)| ActiveModel {
        equipment_id: Set(equipment_id.value()),
        family_id: Set(family.value()),
        position: Set(position as i32),
    });
    Entity::insert_many(rows).exec_without_returning(db).await?;
    Ok(())
}

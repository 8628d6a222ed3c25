use chrono::Utc;
use contracts::domain::a002_equipment_family::aggregate::{
    EquipmentFamily, EquipmentFamilyId, NewEquipmentFamily,
};
use contracts::domain::common::EntityMetadata;
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a002_equipment_family")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: i64,
    pub external_category_id: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for EquipmentFamily {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata::restored(m.created_at, m.updated_at, m.version);

        EquipmentFamily {
            id: EquipmentFamilyId(m.id),
            external_category_id: m.external_category_id,
            taxonomy: m.taxonomy,
            name: m.name,
            slug: m.slug,
            description: m.description,
            parent_id: m.parent_id,
            metadata,
        }
    }
}

pub async fn get_many(
    db: &DatabaseConnection,
    ids: &[EquipmentFamilyId],
) -> anyhow::Result<Vec<EquipmentFamily>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<i64> = ids.iter().map(|id| id.value()).collect();
    let items = Entity::find()
        .filter(Column::Id.is_in(raw))
        .all(db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

/// Точное совпадение имени в пределах таксономии
pub async fn find_by_name(
    db: &DatabaseConnection,
    taxonomy: &str,
    name: &str,
) -> anyhow::Result<Option<EquipmentFamily>> {
    let result = Entity::find()
        .filter(Column::Taxonomy.eq(taxonomy))
        .filter(Column::Name.eq(name))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

pub async fn list_all(
    db: &DatabaseConnection,
    taxonomy: Option<&str>,
) -> anyhow::Result<Vec<EquipmentFamily>> {
    let mut query = Entity::find();
    if let Some(taxonomy) = taxonomy {
        query = query.filter(Column::Taxonomy.eq(taxonomy));
    }
    let items = query
        .order_by_asc(Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn count(db: &DatabaseConnection) -> anyhow::Result<u64> {
    Ok(Entity::find().count(db).await?)
}

pub async fn insert(
    db: &DatabaseConnection,
    new: &NewEquipmentFamily,
) -> anyhow::Result<EquipmentFamily> {
    let now = Utc::now();
    let active = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        taxonomy: Set(new.taxonomy.clone()),
        name: Set(new.name.clone()),
        slug: Set(new.slug.clone()),
        description: Set(new.description.clone()),
        parent_id: Set(new.parent_id),
        external_category_id: Set(new.external_category_id),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        version: Set(0),
    };
    let model = active.insert(db).await?;
    Ok(model.into())
}

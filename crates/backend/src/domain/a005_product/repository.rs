use chrono::Utc;
use contracts::domain::a005_product::{Product, ProductId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a005_product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub pack_size: i32,
    pub purchase_price: Option<f64>,
    pub selling_price: Option<f64>,
    pub quantity: i32,
    pub category_id: Option<String>,
    pub brand_id: Option<String>,
    pub supplier_id: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Product {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        Product {
            base: BaseAggregate::with_metadata(
                ProductId(uuid),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            pack_size: m.pack_size,
            purchase_price: m.purchase_price,
            selling_price: m.selling_price,
            quantity: m.quantity,
            category_id: m.category_id,
            brand_id: m.brand_id,
            supplier_id: m.supplier_id,
        }
    }
}

pub async fn insert<C: ConnectionTrait>(db: &C, aggregate: &Product) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        pack_size: Set(aggregate.pack_size),
        purchase_price: Set(aggregate.purchase_price),
        selling_price: Set(aggregate.selling_price),
        quantity: Set(aggregate.quantity),
        category_id: Set(aggregate.category_id.clone()),
        brand_id: Set(aggregate.brand_id.clone()),
        supplier_id: Set(aggregate.supplier_id.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(db).await?;
    Ok(uuid)
}

/// Найти товар по артикулу (точное совпадение, артикул уже trimmed)
pub async fn find_by_code<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> anyhow::Result<Option<Product>> {
    let result = Entity::find()
        .filter(Column::Code.eq(code))
        .filter(Column::IsDeleted.eq(false))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

pub async fn count_all<C: ConnectionTrait>(db: &C) -> anyhow::Result<u64> {
    use sea_orm::PaginatorTrait;
    Ok(Entity::find().count(db).await?)
}

use chrono::Utc;
use contracts::domain::a004_customer::{Customer, CustomerId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a004_customer")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Customer {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        Customer {
            base: BaseAggregate::with_metadata(
                CustomerId(uuid),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            phone: m.phone,
            email: m.email,
            address: m.address,
        }
    }
}

pub async fn insert<C: ConnectionTrait>(db: &C, aggregate: &Customer) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        phone: Set(aggregate.phone.clone()),
        email: Set(aggregate.email.clone()),
        address: Set(aggregate.address.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(db).await?;
    Ok(uuid)
}

/// Найти покупателя по имени (без учета регистра, после trim)
pub async fn find_by_description_ci<C: ConnectionTrait>(
    db: &C,
    description: &str,
) -> anyhow::Result<Option<Customer>> {
    let wanted = description.trim().to_lowercase();

    let items: Vec<Model> = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(db)
        .await?;

    Ok(items
        .into_iter()
        .find(|m| m.description.trim().to_lowercase() == wanted)
        .map(Into::into))
}

use std::collections::{BTreeMap, HashMap};

use contracts::domain::a001_category::Category;
use contracts::domain::a002_brand::Brand;
use contracts::domain::a003_supplier::Supplier;
use contracts::usecases::u101_csv_import::EntityKind;
use sea_orm::ConnectionTrait;
use serde_json::Value;

use crate::domain::{a001_category, a002_brand, a003_supplier};

use super::validator::ValidatedRow;

/// Разрешённые ссылки товара (UUID-строки)
#[derive(Debug, Clone, Default)]
pub struct ResolvedRefs {
    pub category_id: Option<String>,
    pub brand_id: Option<String>,
    pub supplier_id: Option<String>,
}

/// Строка, готовая к записи: структурная проверка пройдена И ссылки
/// разрешены. Commit Writer принимает только этот тип — строку, минующую
/// resolver, записать невозможно.
#[derive(Debug, Clone)]
pub struct CommittableRow {
    pub row_number: usize,
    pub fields: BTreeMap<String, Value>,
    pub refs: ResolvedRefs,
}

#[derive(Debug)]
pub enum ResolveError {
    /// Имя не найдено, а create_missing_refs выключен. Ошибка уровня строки.
    Unresolved { field: &'static str, name: String },
    /// Ошибка хранилища (включая гонку при автосоздании) — не уровень строки
    Db(anyhow::Error),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum RefField {
    Category,
    Brand,
    Supplier,
}

impl RefField {
    fn field_name(self) -> &'static str {
        match self {
            RefField::Category => "category",
            RefField::Brand => "brand",
            RefField::Supplier => "supplier",
        }
    }
}

/// Разрешает имена категорий/брендов/поставщиков в ID. Живёт один commit:
/// кэш имя->id гарантирует, что неизвестное имя, встреченное в нескольких
/// строках, будет создано ровно один раз. Вызывается только на commit, в
/// abort-режиме — внутри открытой транзакции.
pub struct RefResolver {
    cache: HashMap<(RefField, String), String>,
}

impl RefResolver {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    pub async fn resolve<C: ConnectionTrait>(
        &mut self,
        db: &C,
        kind: EntityKind,
        row_number: usize,
        validated: &ValidatedRow,
        create_missing: bool,
    ) -> Result<CommittableRow, ResolveError> {
        let mut refs = ResolvedRefs::default();

        // Ссылки по имени есть только у товаров
        if kind == EntityKind::Product {
            for ref_field in [RefField::Category, RefField::Brand, RefField::Supplier] {
                let name = match validated.fields.get(ref_field.field_name()) {
                    Some(Value::String(s)) if !s.is_empty() => s.clone(),
                    _ => continue,
                };

                let id = self.resolve_one(db, ref_field, &name, create_missing).await?;
                match ref_field {
                    RefField::Category => refs.category_id = Some(id),
                    RefField::Brand => refs.brand_id = Some(id),
                    RefField::Supplier => refs.supplier_id = Some(id),
                }
            }
        }

        Ok(CommittableRow {
            row_number,
            fields: validated.fields.clone(),
            refs,
        })
    }

    async fn resolve_one<C: ConnectionTrait>(
        &mut self,
        db: &C,
        ref_field: RefField,
        name: &str,
        create_missing: bool,
    ) -> Result<String, ResolveError> {
        let cache_key = (ref_field, name.to_lowercase());
        if let Some(id) = self.cache.get(&cache_key) {
            return Ok(id.clone());
        }

        let existing = match ref_field {
            RefField::Category => a001_category::repository::find_by_description_ci(db, name)
                .await
                .map_err(ResolveError::Db)?
                .map(|c| c.base.id.value().to_string()),
            RefField::Brand => a002_brand::repository::find_by_description_ci(db, name)
                .await
                .map_err(ResolveError::Db)?
                .map(|b| b.base.id.value().to_string()),
            RefField::Supplier => a003_supplier::repository::find_by_description_ci(db, name)
                .await
                .map_err(ResolveError::Db)?
                .map(|s| s.base.id.value().to_string()),
        };

        let id = match existing {
            Some(id) => id,
            None => {
                if !create_missing {
                    return Err(ResolveError::Unresolved {
                        field: ref_field.field_name(),
                        name: name.to_string(),
                    });
                }
                tracing::info!("Auto-creating {} {:?} during import", ref_field.field_name(), name);
                self.create_missing(db, ref_field, name).await?
            }
        };

        self.cache.insert(cache_key, id.clone());
        Ok(id)
    }

    async fn create_missing<C: ConnectionTrait>(
        &self,
        db: &C,
        ref_field: RefField,
        name: &str,
    ) -> Result<String, ResolveError> {
        let uuid = match ref_field {
            RefField::Category => {
                let category = Category::new_for_insert(name.to_string(), None);
                a001_category::repository::insert(db, &category)
                    .await
                    .map_err(ResolveError::Db)?
            }
            RefField::Brand => {
                let brand = Brand::new_for_insert(name.to_string(), None);
                a002_brand::repository::insert(db, &brand)
                    .await
                    .map_err(ResolveError::Db)?
            }
            RefField::Supplier => {
                let supplier = Supplier::new_for_insert(
                    name.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                );
                a003_supplier::repository::insert(db, &supplier)
                    .await
                    .map_err(ResolveError::Db)?
            }
        };
        Ok(uuid.to_string())
    }
}

impl Default for RefResolver {
    fn default() -> Self {
        Self::new()
    }
}

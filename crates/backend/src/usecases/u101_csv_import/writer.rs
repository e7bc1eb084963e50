use std::collections::BTreeMap;

use contracts::domain::a001_category::Category;
use contracts::domain::a002_brand::Brand;
use contracts::domain::a003_supplier::Supplier;
use contracts::domain::a004_customer::Customer;
use contracts::domain::a005_product::Product;
use contracts::usecases::u101_csv_import::EntityKind;
use sea_orm::ConnectionTrait;
use serde_json::Value;

use crate::domain::{a001_category, a002_brand, a003_supplier, a004_customer, a005_product};

use super::resolver::CommittableRow;

/// Результат записи одной строки
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted,
    /// Запись с таким уникальным значением уже есть в БД — это НЕ
    /// "duplicate within file", тот случай ловит validate
    AlreadyExists {
        field: &'static str,
        value: String,
    },
}

fn text(fields: &BTreeMap<String, Value>, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

fn int(fields: &BTreeMap<String, Value>, name: &str) -> Option<i32> {
    fields
        .get(name)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

fn float(fields: &BTreeMap<String, Value>, name: &str) -> Option<f64> {
    fields.get(name).and_then(Value::as_f64)
}

/// Записывает одну строку. Каждая вставка атомарна сама по себе; в режиме
/// "всё или ничего" executor передаёт сюда открытую транзакцию.
pub async fn insert_row<C: ConnectionTrait>(
    db: &C,
    kind: EntityKind,
    row: &CommittableRow,
) -> anyhow::Result<InsertOutcome> {
    match kind {
        EntityKind::Product => insert_product(db, row).await,
        EntityKind::Category => insert_category(db, row).await,
        EntityKind::Brand => insert_brand(db, row).await,
        EntityKind::Supplier => insert_supplier(db, row).await,
        EntityKind::Customer => insert_customer(db, row).await,
    }
}

async fn insert_product<C: ConnectionTrait>(
    db: &C,
    row: &CommittableRow,
) -> anyhow::Result<InsertOutcome> {
    let code = text(&row.fields, "product_code").unwrap_or_default();
    if a005_product::repository::find_by_code(db, &code).await?.is_some() {
        return Ok(InsertOutcome::AlreadyExists {
            field: "product_code",
            value: code,
        });
    }

    let product = Product::new_for_insert(
        code,
        text(&row.fields, "name").unwrap_or_default(),
        int(&row.fields, "pack_size").unwrap_or(1),
        float(&row.fields, "purchase_price"),
        float(&row.fields, "selling_price"),
        int(&row.fields, "quantity").unwrap_or(0),
        row.refs.category_id.clone(),
        row.refs.brand_id.clone(),
        row.refs.supplier_id.clone(),
    );
    a005_product::repository::insert(db, &product).await?;
    Ok(InsertOutcome::Inserted)
}

async fn insert_category<C: ConnectionTrait>(
    db: &C,
    row: &CommittableRow,
) -> anyhow::Result<InsertOutcome> {
    let name = text(&row.fields, "name").unwrap_or_default();
    if a001_category::repository::find_by_description_ci(db, &name)
        .await?
        .is_some()
    {
        return Ok(InsertOutcome::AlreadyExists {
            field: "name",
            value: name,
        });
    }

    let category = Category::new_for_insert(name, text(&row.fields, "description"));
    a001_category::repository::insert(db, &category).await?;
    Ok(InsertOutcome::Inserted)
}

async fn insert_brand<C: ConnectionTrait>(
    db: &C,
    row: &CommittableRow,
) -> anyhow::Result<InsertOutcome> {
    let name = text(&row.fields, "name").unwrap_or_default();
    if a002_brand::repository::find_by_description_ci(db, &name)
        .await?
        .is_some()
    {
        return Ok(InsertOutcome::AlreadyExists {
            field: "name",
            value: name,
        });
    }

    let brand = Brand::new_for_insert(name, text(&row.fields, "description"));
    a002_brand::repository::insert(db, &brand).await?;
    Ok(InsertOutcome::Inserted)
}

async fn insert_supplier<C: ConnectionTrait>(
    db: &C,
    row: &CommittableRow,
) -> anyhow::Result<InsertOutcome> {
    let name = text(&row.fields, "name").unwrap_or_default();
    if a003_supplier::repository::find_by_description_ci(db, &name)
        .await?
        .is_some()
    {
        return Ok(InsertOutcome::AlreadyExists {
            field: "name",
            value: name,
        });
    }

    let supplier = Supplier::new_for_insert(
        name,
        text(&row.fields, "phone").unwrap_or_default(),
        text(&row.fields, "email").unwrap_or_default(),
        text(&row.fields, "address").unwrap_or_default(),
    );
    a003_supplier::repository::insert(db, &supplier).await?;
    Ok(InsertOutcome::Inserted)
}

async fn insert_customer<C: ConnectionTrait>(
    db: &C,
    row: &CommittableRow,
) -> anyhow::Result<InsertOutcome> {
    let name = text(&row.fields, "name").unwrap_or_default();
    if a004_customer::repository::find_by_description_ci(db, &name)
        .await?
        .is_some()
    {
        return Ok(InsertOutcome::AlreadyExists {
            field: "name",
            value: name,
        });
    }

    let customer = Customer::new_for_insert(
        name,
        text(&row.fields, "phone").unwrap_or_default(),
        text(&row.fields, "email").unwrap_or_default(),
        text(&row.fields, "address").unwrap_or_default(),
    );
    a004_customer::repository::insert(db, &customer).await?;
    Ok(InsertOutcome::Inserted)
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Вид сущности для bulk-импорта. Определяет схему строки и таблицу алиасов.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Product,
    Category,
    Brand,
    Supplier,
    Customer,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Product,
        EntityKind::Category,
        EntityKind::Brand,
        EntityKind::Supplier,
        EntityKind::Customer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Category => "category",
            EntityKind::Brand => "brand",
            EntityKind::Supplier => "supplier",
            EntityKind::Customer => "customer",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(EntityKind::Product),
            "category" => Ok(EntityKind::Category),
            "brand" => Ok(EntityKind::Brand),
            "supplier" => Ok(EntityKind::Supplier),
            "customer" => Ok(EntityKind::Customer),
            other => Err(format!("Unknown entity kind: {}", other)),
        }
    }
}

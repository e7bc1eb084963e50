use crate::domain::common::{AggregateId, BaseAggregate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub Uuid);

impl ProductId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for ProductId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(ProductId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Товар. code = артикул (product_code), description = название товара.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(flatten)]
    pub base: BaseAggregate<ProductId>,

    /// Количество единиц в упаковке, строго > 0
    pub pack_size: i32,

    /// Закупочная цена
    #[serde(rename = "purchasePrice")]
    pub purchase_price: Option<f64>,

    /// Цена продажи
    #[serde(rename = "sellingPrice")]
    pub selling_price: Option<f64>,

    /// Остаток на момент загрузки
    #[serde(default)]
    pub quantity: i32,

    #[serde(rename = "categoryId")]
    pub category_id: Option<String>,

    #[serde(rename = "brandId")]
    pub brand_id: Option<String>,

    #[serde(rename = "supplierId")]
    pub supplier_id: Option<String>,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new_for_insert(
        code: String,
        description: String,
        pack_size: i32,
        purchase_price: Option<f64>,
        selling_price: Option<f64>,
        quantity: i32,
        category_id: Option<String>,
        brand_id: Option<String>,
        supplier_id: Option<String>,
    ) -> Self {
        let base = BaseAggregate::new(ProductId::new_v4(), code, description);

        Self {
            base,
            pack_size,
            purchase_price,
            selling_price,
            quantity,
            category_id,
            brand_id,
            supplier_id,
        }
    }
}

use crate::domain::common::{AggregateId, BaseAggregate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrandId(pub Uuid);

impl BrandId {
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

impl AggregateId for BrandId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(BrandId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Торговая марка. description = название бренда.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    #[serde(flatten)]
    pub base: BaseAggregate<BrandId>,
}

impl Brand {
    pub fn new_for_insert(description: String, comment: Option<String>) -> Self {
        let id = BrandId::new_v4();
        let code = format!("BRD-{}", &id.value().simple().to_string()[..8]);
        let mut base = BaseAggregate::new(id, code, description);
        base.comment = comment;

        Self { base }
    }
}

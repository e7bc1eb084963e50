use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ответ validate: итоги проверки + токен для commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub token: String,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub valid_samples: Vec<ValidRowSample>,
    pub invalid_samples: Vec<InvalidRowSample>,
}

/// Пример валидной строки (нормализованные значения)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidRowSample {
    pub row: usize,
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Пример невалидной строки (исходные значения + ошибки по полям)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidRowSample {
    pub row: usize,
    pub data: BTreeMap<String, String>,
    pub errors: BTreeMap<String, String>,
}

/// Ответ commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub message: String,
    pub inserted_count: usize,
    pub skipped_count: usize,
    /// Строки, пропущенные при insert_valid_only=true (номер + причины)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_rows: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row: usize,
    pub errors: BTreeMap<String, String>,
}

use serde::{Deserialize, Serialize};

/// Запрос на фиксацию ранее проверенного батча
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Токен, выданный validate
    pub token: String,

    /// true: вставить только валидные строки; false: всё или ничего
    pub insert_valid_only: bool,

    /// Разделитель, который использовался при validate (повторная проверка)
    pub delimiter: String,

    /// Создавать отсутствующие категории/бренды/поставщиков (только товары).
    /// None — действует флаг, зафиксированный при validate.
    #[serde(default)]
    pub create_missing_refs: Option<bool>,
}

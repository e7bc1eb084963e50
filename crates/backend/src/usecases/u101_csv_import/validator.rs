use std::collections::{BTreeMap, HashMap, HashSet};

use contracts::usecases::u101_csv_import::EntityKind;
use serde_json::Value;

use super::parser::RawRow;
use super::schema::{self, FieldType};

/// Строка, прошедшая структурную проверку. Ссылки на категории/бренды/
/// поставщиков здесь ещё НЕ проверены — это работа resolver на этапе commit.
#[derive(Debug, Clone)]
pub struct ValidatedRow {
    pub fields: BTreeMap<String, Value>,
}

/// Единственный вердикт по строке: либо валидна, либо список ошибок по полям
#[derive(Debug, Clone)]
pub enum RowVerdict {
    Valid(ValidatedRow),
    Invalid { errors: BTreeMap<String, String> },
}

/// Строка staged-батча: исходные значения + вердикт
#[derive(Debug, Clone)]
pub struct ImportRow {
    pub row_number: usize,
    pub raw_fields: HashMap<String, String>,
    pub verdict: RowVerdict,
}

impl ImportRow {
    pub fn is_valid(&self) -> bool {
        matches!(self.verdict, RowVerdict::Valid(_))
    }
}

/// Проверяет все строки файла. Чистая функция: ни сети, ни БД.
/// Ошибки по полям копятся все сразу, не только первая.
pub fn validate_rows(kind: EntityKind, raw_rows: Vec<RawRow>) -> Vec<ImportRow> {
    let unique_field = schema::unique_field(kind);
    let mut seen_unique: HashSet<String> = HashSet::new();

    let mut rows = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        let mut errors: BTreeMap<String, String> = BTreeMap::new();
        let mut fields: BTreeMap<String, Value> = BTreeMap::new();

        for spec in schema::schema_for(kind) {
            let raw_value = raw
                .fields
                .get(spec.name)
                .map(|v| v.trim())
                .unwrap_or_default();

            if raw_value.is_empty() {
                if spec.required {
                    errors.insert(spec.name.to_string(), "required field is missing".to_string());
                }
                continue;
            }

            match normalize_value(spec.field_type, raw_value) {
                Ok(value) => {
                    fields.insert(spec.name.to_string(), value);
                }
                Err(message) => {
                    errors.insert(spec.name.to_string(), message);
                }
            }
        }

        // Дубликаты внутри файла. Это другой вид ошибки, чем "уже есть в БД"
        // (ту обнаруживает commit), сообщения не смешиваются.
        if let Some(Value::String(unique_value)) = fields.get(unique_field) {
            let key = unique_value.to_lowercase();
            if !seen_unique.insert(key) {
                errors.insert(unique_field.to_string(), "duplicate within file".to_string());
            }
        }

        let verdict = if errors.is_empty() {
            RowVerdict::Valid(ValidatedRow { fields })
        } else {
            RowVerdict::Invalid { errors }
        };

        rows.push(ImportRow {
            row_number: raw.row_number,
            raw_fields: raw.fields,
            verdict,
        });
    }

    rows
}

fn normalize_value(field_type: FieldType, raw: &str) -> Result<Value, String> {
    match field_type {
        FieldType::Text => Ok(Value::String(raw.to_string())),
        FieldType::Email => {
            if raw.contains('@') && !raw.starts_with('@') && !raw.ends_with('@') {
                Ok(Value::String(raw.to_string()))
            } else {
                Err("invalid email address".to_string())
            }
        }
        FieldType::Decimal => match parse_decimal(raw) {
            Some(n) if n >= 0.0 => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| "must be a number".to_string()),
            Some(_) => Err("must not be negative".to_string()),
            None => Err("must be a number".to_string()),
        },
        // Целые парсятся сразу как i32: в таблице INTEGER-колонки i32,
        // значение вне диапазона — ошибка строки, а не молчаливое усечение
        FieldType::PositiveInt => match raw.parse::<i32>() {
            Ok(n) if n > 0 => Ok(Value::Number(n.into())),
            _ => Err("must be a positive integer".to_string()),
        },
        FieldType::NonNegativeInt => match raw.parse::<i32>() {
            Ok(n) if n >= 0 => Ok(Value::Number(n.into())),
            _ => Err("must be a non-negative integer".to_string()),
        },
    }
}

/// Парсит десятичное число, допуская запятую как разделитель дробной части
fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(' ', "").replace(',', ".");
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn raw_row(row_number: usize, pairs: &[(&str, &str)]) -> RawRow {
        let fields: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawRow { row_number, fields }
    }

    fn product_row(row_number: usize, code: &str, name: &str, pack: &str) -> RawRow {
        raw_row(
            row_number,
            &[("product_code", code), ("name", name), ("pack_size", pack)],
        )
    }

    #[test]
    fn test_negative_pack_size_fails_only_that_row() {
        let rows = validate_rows(
            EntityKind::Product,
            vec![
                product_row(1, "A-1", "Widget", "10"),
                product_row(2, "A-2", "Gadget", "-5"),
                product_row(3, "A-3", "Gizmo", "1"),
            ],
        );
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_valid());
        assert!(!rows[1].is_valid());
        assert!(rows[2].is_valid());

        match &rows[1].verdict {
            RowVerdict::Invalid { errors } => {
                assert!(errors.contains_key("pack_size"));
            }
            _ => panic!("row 2 must be invalid"),
        }
    }

    #[test]
    fn test_all_field_errors_are_reported_at_once() {
        let rows = validate_rows(
            EntityKind::Product,
            vec![raw_row(
                1,
                &[
                    ("product_code", "A-1"),
                    ("pack_size", "zero"),
                    ("purchase_price", "-3"),
                ],
            )],
        );
        match &rows[0].verdict {
            RowVerdict::Invalid { errors } => {
                assert!(errors.contains_key("name"), "missing required name");
                assert!(errors.contains_key("pack_size"));
                assert!(errors.contains_key("purchase_price"));
            }
            _ => panic!("row must be invalid"),
        }
    }

    #[test]
    fn test_int_fields_reject_values_outside_i32() {
        // 2147483648 == i32::MAX + 1: должен падать на валидации, а не
        // усекаться при записи
        let rows = validate_rows(
            EntityKind::Product,
            vec![
                product_row(1, "A-1", "Widget", "2147483648"),
                product_row(2, "A-2", "Gadget", "2147483647"),
            ],
        );
        match &rows[0].verdict {
            RowVerdict::Invalid { errors } => {
                assert_eq!(errors.get("pack_size").unwrap(), "must be a positive integer");
            }
            _ => panic!("out-of-range pack_size must be invalid"),
        }
        assert!(rows[1].is_valid());
    }

    #[test]
    fn test_duplicate_within_file_is_tagged_distinctly() {
        let rows = validate_rows(
            EntityKind::Product,
            vec![
                product_row(1, "A-1", "Widget", "10"),
                product_row(2, "a-1", "Widget again", "10"),
            ],
        );
        assert!(rows[0].is_valid());
        match &rows[1].verdict {
            RowVerdict::Invalid { errors } => {
                assert_eq!(errors.get("product_code").unwrap(), "duplicate within file");
            }
            _ => panic!("duplicate row must be invalid"),
        }
    }

    #[test]
    fn test_decimal_accepts_comma_separator() {
        let rows = validate_rows(
            EntityKind::Product,
            vec![raw_row(
                1,
                &[
                    ("product_code", "A-1"),
                    ("name", "Widget"),
                    ("pack_size", "2"),
                    ("selling_price", "12,50"),
                ],
            )],
        );
        match &rows[0].verdict {
            RowVerdict::Valid(v) => {
                assert_eq!(v.fields.get("selling_price").unwrap().as_f64(), Some(12.5));
            }
            _ => panic!("row must be valid"),
        }
    }

    #[test]
    fn test_invalid_email() {
        let rows = validate_rows(
            EntityKind::Supplier,
            vec![raw_row(1, &[("name", "Acme"), ("email", "not-an-email")])],
        );
        match &rows[0].verdict {
            RowVerdict::Invalid { errors } => {
                assert_eq!(errors.get("email").unwrap(), "invalid email address");
            }
            _ => panic!("row must be invalid"),
        }
    }

    #[test]
    fn test_values_are_trimmed() {
        let rows = validate_rows(
            EntityKind::Brand,
            vec![raw_row(1, &[("name", "  Acme  ")])],
        );
        match &rows[0].verdict {
            RowVerdict::Valid(v) => {
                assert_eq!(v.fields.get("name").unwrap().as_str(), Some("Acme"));
            }
            _ => panic!("row must be valid"),
        }
    }
}

use std::collections::HashMap;

use contracts::usecases::u101_csv_import::EntityKind;

use super::error::ImportError;
use super::schema;

/// Разделитель полей CSV. Закрытый набор — всё остальное InvalidDelimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    pub fn parse(raw: &str) -> Result<Self, ImportError> {
        match raw {
            "," => Ok(Delimiter::Comma),
            ";" => Ok(Delimiter::Semicolon),
            "\t" | "\\t" => Ok(Delimiter::Tab),
            "|" => Ok(Delimiter::Pipe),
            other => Err(ImportError::InvalidDelimiter(other.to_string())),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::Comma => ",",
            Delimiter::Semicolon => ";",
            Delimiter::Tab => "\t",
            Delimiter::Pipe => "|",
        }
    }
}

/// Сырая строка файла: канонизированные имена колонок -> исходные значения
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based номер строки данных (заголовок и пустые строки не считаются)
    pub row_number: usize,
    pub fields: HashMap<String, String>,
}

/// Разбирает файл в последовательность RawRow.
///
/// Заголовки матчатся без учета регистра и через таблицу алиасов вида
/// сущности. Неизвестные колонки сохраняются как есть (в нижнем регистре) и
/// дальше не проверяются. Пустой файл — валидный случай с нулём строк.
pub fn parse(
    bytes: &[u8],
    delimiter: Delimiter,
    kind: EntityKind,
) -> Result<Vec<RawRow>, ImportError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ImportError::MalformedFile("file is not valid UTF-8".to_string()))?;

    // Strip UTF-8 BOM if present
    let text = text.trim_start_matches('\u{FEFF}');
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ImportError::MalformedFile(e.to_string()))?
        .clone();

    let canonical: Vec<String> = headers
        .iter()
        .map(|h| canonical_field(kind, h))
        .collect();

    let mut rows = Vec::new();
    let mut row_number = 0usize;

    for result in reader.records() {
        let record = result.map_err(|e| ImportError::MalformedFile(e.to_string()))?;

        // Пустые строки пропускаются и не получают row_number
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        row_number += 1;

        let mut fields = HashMap::with_capacity(record.len());
        for (i, value) in record.iter().enumerate() {
            let name = canonical
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("column_{}", i + 1));
            fields.insert(name, value.to_string());
        }
        rows.push(RawRow { row_number, fields });
    }

    Ok(rows)
}

/// Каноническое имя поля для заголовка колонки (case-insensitive + алиасы)
fn canonical_field(kind: EntityKind, header: &str) -> String {
    let h = header.trim().to_lowercase();
    for spec in schema::schema_for(kind) {
        if spec.name == h || spec.aliases.contains(&h.as_str()) {
            return spec.name.to_string();
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_parse() {
        assert_eq!(Delimiter::parse(",").unwrap(), Delimiter::Comma);
        assert_eq!(Delimiter::parse(";").unwrap(), Delimiter::Semicolon);
        assert_eq!(Delimiter::parse("\t").unwrap(), Delimiter::Tab);
        assert_eq!(Delimiter::parse("|").unwrap(), Delimiter::Pipe);
        assert!(matches!(
            Delimiter::parse(":"),
            Err(ImportError::InvalidDelimiter(_))
        ));
    }

    #[test]
    fn test_header_aliases_are_canonicalized() {
        let csv = "SKU,Product_Name,pack\nA-1,Widget,10\n";
        let rows = parse(csv.as_bytes(), Delimiter::Comma, EntityKind::Product).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields.get("product_code").unwrap(), "A-1");
        assert_eq!(rows[0].fields.get("name").unwrap(), "Widget");
        assert_eq!(rows[0].fields.get("pack_size").unwrap(), "10");
    }

    #[test]
    fn test_unknown_columns_are_preserved() {
        let csv = "name,Warehouse\nAcme,Main\n";
        let rows = parse(csv.as_bytes(), Delimiter::Comma, EntityKind::Brand).unwrap();
        assert_eq!(rows[0].fields.get("warehouse").unwrap(), "Main");
    }

    #[test]
    fn test_blank_lines_do_not_consume_row_numbers() {
        let csv = "name\nAcme\n\n\nGlobex\n\n";
        let rows = parse(csv.as_bytes(), Delimiter::Comma, EntityKind::Brand).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(rows[1].row_number, 2);
    }

    #[test]
    fn test_empty_and_header_only_files_yield_zero_rows() {
        assert!(parse(b"", Delimiter::Comma, EntityKind::Category)
            .unwrap()
            .is_empty());
        assert!(parse(b"name,description\n", Delimiter::Comma, EntityKind::Category)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_semicolon_delimiter() {
        let csv = "name;phone\nAcme Ltd;555-01\n";
        let rows = parse(csv.as_bytes(), Delimiter::Semicolon, EntityKind::Supplier).unwrap();
        assert_eq!(rows[0].fields.get("name").unwrap(), "Acme Ltd");
        assert_eq!(rows[0].fields.get("phone").unwrap(), "555-01");
    }

    #[test]
    fn test_bom_is_stripped() {
        let csv = "\u{FEFF}name\nAcme\n";
        let rows = parse(csv.as_bytes(), Delimiter::Comma, EntityKind::Brand).unwrap();
        assert_eq!(rows[0].fields.get("name").unwrap(), "Acme");
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let bytes = [0xFF, 0xFE, 0x00];
        assert!(matches!(
            parse(&bytes, Delimiter::Comma, EntityKind::Brand),
            Err(ImportError::MalformedFile(_))
        ));
    }
}

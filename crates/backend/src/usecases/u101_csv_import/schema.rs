use contracts::usecases::u101_csv_import::EntityKind;

/// Тип поля в схеме импорта. Определяет нормализацию и проверку значения.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Email,
    /// Неотрицательное число с плавающей точкой (цены)
    Decimal,
    /// Целое > 0
    PositiveInt,
    /// Целое >= 0
    NonNegativeInt,
}

/// Описание одного логического поля: каноническое имя + алиасы заголовков
pub struct FieldSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
    pub field_type: FieldType,
}

const PRODUCT_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "product_code",
        aliases: &["code", "sku"],
        required: true,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "name",
        aliases: &["product_name"],
        required: true,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "pack_size",
        aliases: &["pack", "packsize"],
        required: true,
        field_type: FieldType::PositiveInt,
    },
    FieldSpec {
        name: "category",
        aliases: &["category_name", "category_id"],
        required: false,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "brand",
        aliases: &["brand_name", "brand_id"],
        required: false,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "supplier",
        aliases: &["supplier_name", "supplier_id"],
        required: false,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "purchase_price",
        aliases: &["cost", "cost_price"],
        required: false,
        field_type: FieldType::Decimal,
    },
    FieldSpec {
        name: "selling_price",
        aliases: &["price", "sale_price"],
        required: false,
        field_type: FieldType::Decimal,
    },
    FieldSpec {
        name: "quantity",
        aliases: &["qty", "stock"],
        required: false,
        field_type: FieldType::NonNegativeInt,
    },
];

const CATEGORY_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        aliases: &["category", "category_name"],
        required: true,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "description",
        aliases: &["comment"],
        required: false,
        field_type: FieldType::Text,
    },
];

const BRAND_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        aliases: &["brand", "brand_name"],
        required: true,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "description",
        aliases: &["comment"],
        required: false,
        field_type: FieldType::Text,
    },
];

const SUPPLIER_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        aliases: &["supplier", "supplier_name"],
        required: true,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "phone",
        aliases: &["phone_number", "mobile"],
        required: false,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "email",
        aliases: &["e-mail", "mail"],
        required: false,
        field_type: FieldType::Email,
    },
    FieldSpec {
        name: "address",
        aliases: &[],
        required: false,
        field_type: FieldType::Text,
    },
];

const CUSTOMER_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        aliases: &["customer", "customer_name"],
        required: true,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "phone",
        aliases: &["phone_number", "mobile"],
        required: false,
        field_type: FieldType::Text,
    },
    FieldSpec {
        name: "email",
        aliases: &["e-mail", "mail"],
        required: false,
        field_type: FieldType::Email,
    },
    FieldSpec {
        name: "address",
        aliases: &[],
        required: false,
        field_type: FieldType::Text,
    },
];

pub fn schema_for(kind: EntityKind) -> &'static [FieldSpec] {
    match kind {
        EntityKind::Product => PRODUCT_SCHEMA,
        EntityKind::Category => CATEGORY_SCHEMA,
        EntityKind::Brand => BRAND_SCHEMA,
        EntityKind::Supplier => SUPPLIER_SCHEMA,
        EntityKind::Customer => CUSTOMER_SCHEMA,
    }
}

/// Поле, уникальное внутри файла: артикул для товаров, название для остальных
pub fn unique_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Product => "product_code",
        _ => "name",
    }
}

/// Шаблон CSV: только строка заголовка с каноническими именами
pub fn template_csv(kind: EntityKind) -> String {
    let header: Vec<&str> = schema_for(kind).iter().map(|s| s.name).collect();
    format!("{}\n", header.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_schema_has_required_fields() {
        for kind in EntityKind::ALL {
            assert!(
                schema_for(kind).iter().any(|s| s.required),
                "{} schema has no required fields",
                kind
            );
        }
    }

    #[test]
    fn test_unique_field_is_part_of_schema() {
        for kind in EntityKind::ALL {
            let unique = unique_field(kind);
            assert!(schema_for(kind).iter().any(|s| s.name == unique));
        }
    }

    #[test]
    fn test_template_starts_with_unique_field() {
        assert!(template_csv(EntityKind::Product).starts_with("product_code,"));
        assert!(template_csv(EntityKind::Brand).starts_with("name,"));
    }
}

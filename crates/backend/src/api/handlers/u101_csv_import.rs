use axum::extract::{Multipart, Path};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use once_cell::sync::Lazy;
use std::sync::Arc;

use contracts::usecases::u101_csv_import::{
    CommitRequest, CommitResponse, EntityKind, ValidateResponse,
};

use crate::shared::config;
use crate::shared::data::db::get_connection;
use crate::usecases::u101_csv_import::{schema, ImportError, ImportExecutor};

static CSV_IMPORT: Lazy<Arc<ImportExecutor>> = Lazy::new(|| {
    let ttl_minutes = config::load_config()
        .map(|c| c.import.ttl_minutes)
        .unwrap_or(20);
    Arc::new(ImportExecutor::new(ttl_minutes))
});

/// Доступ к экзекьютору для фоновой уборки staging store (см. main.rs)
pub fn executor() -> Arc<ImportExecutor> {
    CSV_IMPORT.clone()
}

fn parse_kind(entity: &str) -> Result<EntityKind, ImportError> {
    entity
        .parse()
        .map_err(|_| ImportError::UnknownEntityKind(entity.to_string()))
}

/// POST /api/:entity/import/validate
pub async fn validate(
    Path(entity): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ValidateResponse>, ImportError> {
    let kind = parse_kind(&entity)?;

    let mut file: Option<Vec<u8>> = None;
    let mut delimiter = String::from(",");
    let mut create_missing_refs = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::InvalidRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ImportError::InvalidRequest(e.to_string()))?;
                file = Some(bytes.to_vec());
            }
            "delimiter" => {
                delimiter = field
                    .text()
                    .await
                    .map_err(|e| ImportError::InvalidRequest(e.to_string()))?;
            }
            "create_missing_refs" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ImportError::InvalidRequest(e.to_string()))?;
                create_missing_refs = matches!(text.trim(), "true" | "1" | "on");
            }
            _ => {}
        }
    }

    let file = file.ok_or(ImportError::MissingFile)?;
    let response = CSV_IMPORT.validate(kind, &file, &delimiter, create_missing_refs)?;
    Ok(Json(response))
}

/// POST /api/:entity/import/commit
pub async fn commit(
    Path(entity): Path<String>,
    Json(request): Json<CommitRequest>,
) -> Result<Json<CommitResponse>, ImportError> {
    let kind = parse_kind(&entity)?;
    let response = CSV_IMPORT.commit(get_connection(), kind, request).await?;
    Ok(Json(response))
}

/// GET /api/:entity/import/template
pub async fn template(Path(entity): Path<String>) -> Result<impl IntoResponse, ImportError> {
    let kind = parse_kind(&entity)?;
    let body = schema::template_csv(kind);
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "text/csv; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}_import_template.csv\"", kind),
            ),
        ],
        body,
    ))
}

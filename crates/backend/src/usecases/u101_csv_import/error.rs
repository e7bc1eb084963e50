use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::usecases::u101_csv_import::EntityKind;
use serde_json::json;
use thiserror::Error;

/// Таксономия ошибок bulk-импорта. Ошибки уровня строки сюда не попадают —
/// они агрегируются в ответах validate/commit.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported delimiter {0:?}, expected one of \",\", \";\", tab, \"|\"")]
    InvalidDelimiter(String),

    #[error("File could not be parsed as CSV: {0}")]
    MalformedFile(String),

    #[error("Multipart form is missing the \"file\" field")]
    MissingFile,

    #[error("Bad request: {0}")]
    InvalidRequest(String),

    #[error("Unknown entity kind {0:?}")]
    UnknownEntityKind(String),

    #[error("Import token not found")]
    TokenNotFound,

    #[error("Import token has expired, re-run validation")]
    TokenExpired,

    #[error("Import token was already used by a previous commit")]
    TokenAlreadyConsumed,

    #[error("Delimiter {got:?} does not match the delimiter used at validation ({expected:?})")]
    DelimiterMismatch { expected: String, got: String },

    #[error("Token belongs to a {actual} import, not {requested}")]
    EntityKindMismatch {
        actual: EntityKind,
        requested: EntityKind,
    },

    #[error("{invalid} of {total} rows failed validation, nothing was inserted")]
    RowsInvalid { invalid: usize, total: usize },

    #[error("Row {row}: unknown {field} {name:?}, nothing was inserted")]
    UnresolvedReference {
        row: usize,
        field: String,
        name: String,
    },

    #[error("Row {row}: {field} {value:?} already exists in database, nothing was inserted")]
    AlreadyExists {
        row: usize,
        field: String,
        value: String,
    },

    /// Ошибка хранилища. Детали в логах, наружу не отдаётся.
    #[error("Internal storage error")]
    Persistence(anyhow::Error),
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        let status = match &self {
            ImportError::InvalidDelimiter(_)
            | ImportError::MalformedFile(_)
            | ImportError::MissingFile
            | ImportError::InvalidRequest(_)
            | ImportError::UnknownEntityKind(_) => StatusCode::BAD_REQUEST,
            ImportError::TokenNotFound => StatusCode::NOT_FOUND,
            ImportError::TokenExpired => StatusCode::GONE,
            ImportError::TokenAlreadyConsumed => StatusCode::CONFLICT,
            ImportError::DelimiterMismatch { .. }
            | ImportError::EntityKindMismatch { .. }
            | ImportError::RowsInvalid { .. }
            | ImportError::UnresolvedReference { .. }
            | ImportError::AlreadyExists { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ImportError::Persistence(e) => {
                tracing::error!("Import persistence failure: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_message_hides_details() {
        let err = ImportError::Persistence(anyhow::anyhow!("UNIQUE constraint failed: secret"));
        assert_eq!(err.to_string(), "Internal storage error");
    }
}

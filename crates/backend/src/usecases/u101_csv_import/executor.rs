use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use contracts::usecases::u101_csv_import::{
    CommitRequest, CommitResponse, EntityKind, InvalidRowSample, SkippedRow, ValidRowSample,
    ValidateResponse,
};
use sea_orm::{DatabaseConnection, TransactionTrait};

use super::error::ImportError;
use super::parser::{self, Delimiter};
use super::resolver::{RefResolver, ResolveError};
use super::staging::{StagedBatch, StagingStore};
use super::validator::{self, ImportRow, RowVerdict};
use super::writer::{self, InsertOutcome};

/// Сколько примеров валидных/невалидных строк отдаёт validate.
/// Полные данные остаются в staging store до commit.
const SAMPLE_LIMIT: usize = 10;

/// Координатор двухфазного импорта: validate (parse -> validate -> stage) и
/// commit (take -> resolve refs -> persist).
pub struct ImportExecutor {
    staging: Arc<StagingStore>,
}

impl ImportExecutor {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            staging: Arc::new(StagingStore::new(Duration::minutes(ttl_minutes))),
        }
    }

    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    /// Фаза 1: разбор и проверка файла без какой-либо записи в БД
    pub fn validate(
        &self,
        kind: EntityKind,
        file_bytes: &[u8],
        delimiter_raw: &str,
        create_missing_refs: bool,
    ) -> Result<ValidateResponse, ImportError> {
        let delimiter = Delimiter::parse(delimiter_raw)?;
        let raw_rows = parser::parse(file_bytes, delimiter, kind)?;
        let rows = validator::validate_rows(kind, raw_rows);

        let total = rows.len();
        let valid = rows.iter().filter(|r| r.is_valid()).count();
        let invalid = total - valid;

        let valid_samples = rows
            .iter()
            .filter_map(|row| match &row.verdict {
                RowVerdict::Valid(v) => Some(ValidRowSample {
                    row: row.row_number,
                    data: v.fields.clone(),
                }),
                RowVerdict::Invalid { .. } => None,
            })
            .take(SAMPLE_LIMIT)
            .collect();

        let invalid_samples = rows
            .iter()
            .filter_map(|row| match &row.verdict {
                RowVerdict::Invalid { errors } => Some(InvalidRowSample {
                    row: row.row_number,
                    data: row
                        .raw_fields
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                    errors: errors.clone(),
                }),
                RowVerdict::Valid(_) => None,
            })
            .take(SAMPLE_LIMIT)
            .collect();

        let token = self
            .staging
            .put(kind, delimiter, create_missing_refs, rows);

        tracing::info!(
            "Validated {} import: {} rows ({} valid, {} invalid), token {}",
            kind,
            total,
            valid,
            invalid,
            token
        );

        Ok(ValidateResponse {
            token,
            total,
            valid,
            invalid,
            valid_samples,
            invalid_samples,
        })
    }

    /// Фаза 2: запись ранее проверенного батча
    pub async fn commit(
        &self,
        db: &DatabaseConnection,
        kind: EntityKind,
        request: CommitRequest,
    ) -> Result<CommitResponse, ImportError> {
        let delimiter = Delimiter::parse(&request.delimiter)?;
        let batch = self
            .staging
            .take_for_commit(&request.token, kind, delimiter)?;

        let create_missing = request
            .create_missing_refs
            .unwrap_or(batch.create_missing_refs);

        let response = if request.insert_valid_only {
            self.commit_valid_only(db, kind, &batch, create_missing).await?
        } else {
            self.commit_all_or_nothing(db, kind, &batch, create_missing)
                .await?
        };

        tracing::info!(
            "Committed {} import, token {}: {} inserted, {} skipped",
            kind,
            batch.token,
            response.inserted_count,
            response.skipped_count
        );
        Ok(response)
    }

    /// insert_valid_only=true: каждая строка независима, невалидные и
    /// неразрешившиеся пропускаются со счётчиком, батч не прерывается
    async fn commit_valid_only(
        &self,
        db: &DatabaseConnection,
        kind: EntityKind,
        batch: &StagedBatch,
        create_missing: bool,
    ) -> Result<CommitResponse, ImportError> {
        let mut resolver = RefResolver::new();
        let mut inserted = 0usize;
        let mut skipped_rows: Vec<SkippedRow> = Vec::new();

        for row in &batch.rows {
            let validated = match &row.verdict {
                RowVerdict::Valid(v) => v,
                RowVerdict::Invalid { errors } => {
                    skipped_rows.push(SkippedRow {
                        row: row.row_number,
                        errors: errors.clone(),
                    });
                    continue;
                }
            };

            let committable = match resolver
                .resolve(db, kind, row.row_number, validated, create_missing)
                .await
            {
                Ok(c) => c,
                Err(ResolveError::Unresolved { field, name }) => {
                    skipped_rows.push(skip_one(
                        row,
                        field,
                        format!("unknown {} {:?}", field, name),
                    ));
                    continue;
                }
                Err(ResolveError::Db(e)) => return Err(ImportError::Persistence(e)),
            };

            match writer::insert_row(db, kind, &committable).await {
                Ok(InsertOutcome::Inserted) => inserted += 1,
                Ok(InsertOutcome::AlreadyExists { field, .. }) => {
                    skipped_rows.push(skip_one(
                        row,
                        field,
                        "already exists in database".to_string(),
                    ));
                }
                Err(e) => return Err(ImportError::Persistence(e)),
            }
        }

        let skipped_count = skipped_rows.len();
        Ok(CommitResponse {
            message: format!(
                "Imported {} of {} rows ({} skipped)",
                inserted,
                batch.rows.len(),
                skipped_count
            ),
            inserted_count: inserted,
            skipped_count,
            skipped_rows,
        })
    }

    /// insert_valid_only=false: одна транзакция на весь батч, любая ошибка
    /// строки (в т.ч. обнаруженная только на commit) откатывает всё.
    /// Возвращённая ошибка бросает открытую транзакцию — drop откатывает её.
    async fn commit_all_or_nothing(
        &self,
        db: &DatabaseConnection,
        kind: EntityKind,
        batch: &StagedBatch,
        create_missing: bool,
    ) -> Result<CommitResponse, ImportError> {
        let total = batch.rows.len();
        let invalid = batch.rows.iter().filter(|r| !r.is_valid()).count();
        if invalid > 0 {
            return Err(ImportError::RowsInvalid { invalid, total });
        }

        let txn = db
            .begin()
            .await
            .map_err(|e| ImportError::Persistence(e.into()))?;
        let mut resolver = RefResolver::new();
        let mut inserted = 0usize;

        for row in &batch.rows {
            let RowVerdict::Valid(validated) = &row.verdict else {
                continue;
            };

            let committable = match resolver
                .resolve(&txn, kind, row.row_number, validated, create_missing)
                .await
            {
                Ok(c) => c,
                Err(ResolveError::Unresolved { field, name }) => {
                    return Err(ImportError::UnresolvedReference {
                        row: row.row_number,
                        field: field.to_string(),
                        name,
                    });
                }
                Err(ResolveError::Db(e)) => return Err(ImportError::Persistence(e)),
            };

            match writer::insert_row(&txn, kind, &committable).await {
                Ok(InsertOutcome::Inserted) => inserted += 1,
                Ok(InsertOutcome::AlreadyExists { field, value }) => {
                    return Err(ImportError::AlreadyExists {
                        row: row.row_number,
                        field: field.to_string(),
                        value,
                    });
                }
                Err(e) => return Err(ImportError::Persistence(e)),
            }
        }

        txn.commit()
            .await
            .map_err(|e| ImportError::Persistence(e.into()))?;

        Ok(CommitResponse {
            message: format!("Imported all {} rows", inserted),
            inserted_count: inserted,
            skipped_count: 0,
            skipped_rows: Vec::new(),
        })
    }
}

fn skip_one(row: &ImportRow, field: &str, message: String) -> SkippedRow {
    let mut errors = BTreeMap::new();
    errors.insert(field.to_string(), message);
    SkippedRow {
        row: row.row_number,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{a002_brand, a005_product};
    use crate::shared::data::db::create_tables;
    use sea_orm::{ConnectOptions, Database};

    async fn test_db() -> DatabaseConnection {
        // Одно соединение, иначе каждый коннект пула видит свою :memory: БД
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        create_tables(&db).await.unwrap();
        db
    }

    fn commit_request(token: &str, insert_valid_only: bool) -> CommitRequest {
        CommitRequest {
            token: token.to_string(),
            insert_valid_only,
            delimiter: ",".to_string(),
            create_missing_refs: None,
        }
    }

    const PRODUCTS_ONE_BAD_PACK: &str = "\
product_code,name,pack_size
A-1,Widget,10
A-2,Gadget,-5
A-3,Gizmo,1
";

    #[test]
    fn test_validate_counts_and_samples() {
        let executor = ImportExecutor::new(20);
        let response = executor
            .validate(EntityKind::Product, PRODUCTS_ONE_BAD_PACK.as_bytes(), ",", false)
            .unwrap();

        assert_eq!(response.total, 3);
        assert_eq!(response.valid, 2);
        assert_eq!(response.invalid, 1);
        assert_eq!(response.valid + response.invalid, response.total);
        assert_eq!(response.invalid_samples.len(), 1);
        assert_eq!(response.invalid_samples[0].row, 2);
        assert!(response.invalid_samples[0].errors.contains_key("pack_size"));
    }

    #[test]
    fn test_validate_is_idempotent_but_tokens_differ() {
        let executor = ImportExecutor::new(20);
        let first = executor
            .validate(EntityKind::Product, PRODUCTS_ONE_BAD_PACK.as_bytes(), ",", false)
            .unwrap();
        let second = executor
            .validate(EntityKind::Product, PRODUCTS_ONE_BAD_PACK.as_bytes(), ",", false)
            .unwrap();

        assert_eq!(first.total, second.total);
        assert_eq!(first.valid, second.valid);
        assert_eq!(first.invalid, second.invalid);
        assert_ne!(first.token, second.token);
    }

    #[tokio::test]
    async fn test_valid_only_commit_skips_bad_rows() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let validated = executor
            .validate(EntityKind::Product, PRODUCTS_ONE_BAD_PACK.as_bytes(), ",", false)
            .unwrap();

        let committed = executor
            .commit(&db, EntityKind::Product, commit_request(&validated.token, true))
            .await
            .unwrap();

        assert_eq!(committed.inserted_count, 2);
        assert_eq!(committed.skipped_count, 1);
        assert_eq!(committed.skipped_rows[0].row, 2);
        assert_eq!(a005_product::repository::count_all(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_second_commit_is_already_consumed() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let validated = executor
            .validate(EntityKind::Product, PRODUCTS_ONE_BAD_PACK.as_bytes(), ",", false)
            .unwrap();
        executor
            .commit(&db, EntityKind::Product, commit_request(&validated.token, true))
            .await
            .unwrap();

        let err = executor
            .commit(&db, EntityKind::Product, commit_request(&validated.token, true))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::TokenAlreadyConsumed));
    }

    #[tokio::test]
    async fn test_abort_mode_rolls_back_on_invalid_row() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let validated = executor
            .validate(EntityKind::Product, PRODUCTS_ONE_BAD_PACK.as_bytes(), ",", false)
            .unwrap();

        let err = executor
            .commit(&db, EntityKind::Product, commit_request(&validated.token, false))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::RowsInvalid { invalid: 1, total: 3 }));
        assert_eq!(a005_product::repository::count_all(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_abort_mode_fails_on_unresolved_brand() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let csv = "product_code,name,pack_size,brand\nA-1,Widget,10,NoSuchBrand\n";
        let validated = executor
            .validate(EntityKind::Product, csv.as_bytes(), ",", false)
            .unwrap();
        assert_eq!(validated.invalid, 0);

        let err = executor
            .commit(&db, EntityKind::Product, commit_request(&validated.token, false))
            .await
            .unwrap_err();
        match err {
            ImportError::UnresolvedReference { row, ref field, ref name } => {
                assert_eq!(row, 1);
                assert_eq!(field, "brand");
                assert_eq!(name, "NoSuchBrand");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(a005_product::repository::count_all(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_brand_is_created_exactly_once() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let csv = "\
product_code,name,pack_size,brand
A-1,Widget,10,FreshBrand
A-2,Gadget,5,freshbrand
";
        let validated = executor
            .validate(EntityKind::Product, csv.as_bytes(), ",", true)
            .unwrap();

        let committed = executor
            .commit(&db, EntityKind::Product, commit_request(&validated.token, false))
            .await
            .unwrap();
        assert_eq!(committed.inserted_count, 2);

        assert_eq!(a002_brand::repository::count_all(&db).await.unwrap(), 1);
        let brand = a002_brand::repository::find_by_description_ci(&db, "FRESHBRAND")
            .await
            .unwrap()
            .expect("brand must exist");
        assert_eq!(brand.base.description, "FreshBrand");
    }

    #[tokio::test]
    async fn test_delimiter_mismatch_then_correct_commit() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let csv = "name;description\nAcme;tools\n";
        let validated = executor
            .validate(EntityKind::Brand, csv.as_bytes(), ";", false)
            .unwrap();

        let mut bad = commit_request(&validated.token, true);
        bad.delimiter = ",".to_string();
        let err = executor
            .commit(&db, EntityKind::Brand, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::DelimiterMismatch { .. }));

        let mut good = commit_request(&validated.token, true);
        good.delimiter = ";".to_string();
        let committed = executor
            .commit(&db, EntityKind::Brand, good)
            .await
            .unwrap();
        assert_eq!(committed.inserted_count, 1);
    }

    #[tokio::test]
    async fn test_existing_row_in_db_is_skipped_with_distinct_message() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let csv = "name\nAcme\n";
        let first = executor
            .validate(EntityKind::Brand, csv.as_bytes(), ",", false)
            .unwrap();
        executor
            .commit(&db, EntityKind::Brand, commit_request(&first.token, true))
            .await
            .unwrap();

        let second = executor
            .validate(EntityKind::Brand, csv.as_bytes(), ",", false)
            .unwrap();
        let committed = executor
            .commit(&db, EntityKind::Brand, commit_request(&second.token, true))
            .await
            .unwrap();

        assert_eq!(committed.inserted_count, 0);
        assert_eq!(committed.skipped_count, 1);
        assert_eq!(
            committed.skipped_rows[0].errors.get("name").unwrap(),
            "already exists in database"
        );
    }

    #[tokio::test]
    async fn test_overflowing_pack_size_is_never_persisted() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let csv = "product_code,name,pack_size\nA-1,Widget,2147483648\n";
        let validated = executor
            .validate(EntityKind::Product, csv.as_bytes(), ",", false)
            .unwrap();
        assert_eq!(validated.invalid, 1);

        let committed = executor
            .commit(&db, EntityKind::Product, commit_request(&validated.token, true))
            .await
            .unwrap();
        assert_eq!(committed.inserted_count, 0);
        assert_eq!(a005_product::repository::count_all(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_never_commits() {
        let db = test_db().await;
        let executor = ImportExecutor::new(20);

        let validated = executor
            .validate(EntityKind::Brand, "name\nAcme\n".as_bytes(), ",", false)
            .unwrap();
        executor.staging().force_expire(&validated.token);

        let err = executor
            .commit(&db, EntityKind::Brand, commit_request(&validated.token, true))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::TokenExpired));
        assert_eq!(a002_brand::repository::count_all(&db).await.unwrap(), 0);
    }
}

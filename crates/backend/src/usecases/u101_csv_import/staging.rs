use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use contracts::usecases::u101_csv_import::EntityKind;

use super::error::ImportError;
use super::parser::Delimiter;
use super::validator::ImportRow;

/// Проверенный батч, ожидающий commit за непрозрачным токеном
#[derive(Debug, Clone)]
pub struct StagedBatch {
    pub token: String,
    pub entity_kind: EntityKind,
    pub delimiter: Delimiter,
    pub create_missing_refs: bool,
    pub rows: Vec<ImportRow>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory staging store (ключ — токен, токен — граница конкурентности).
/// Эфемерное хранилище: рестарт процесса теряет staged-батчи, клиент
/// перезагружает файл.
pub struct StagingStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, StagedBatch>>,
    /// Токены, уже использованные commit (отличает 409 от 404)
    consumed: RwLock<HashMap<String, DateTime<Utc>>>,
}

/// 128 бит случайности, hex. Токен не несёт никакой семантики.
fn generate_token() -> String {
    format!("{:032x}", rand::random::<u128>())
}

impl StagingStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            consumed: RwLock::new(HashMap::new()),
        }
    }

    /// Застейджить батч, вернуть токен
    pub fn put(
        &self,
        entity_kind: EntityKind,
        delimiter: Delimiter,
        create_missing_refs: bool,
        rows: Vec<ImportRow>,
    ) -> String {
        let token = generate_token();
        let created_at = Utc::now();
        let batch = StagedBatch {
            token: token.clone(),
            entity_kind,
            delimiter,
            create_missing_refs,
            rows,
            created_at,
            expires_at: created_at + self.ttl,
        };

        let mut entries = self.entries.write().unwrap();
        entries.insert(token.clone(), batch);
        token
    }

    /// Забрать батч для commit. Единственная секция, где решается судьба
    /// токена: ровно один конкурентный commit получает батч, остальные —
    /// TokenAlreadyConsumed. DelimiterMismatch и EntityKindMismatch токен
    /// НЕ расходуют: это ошибка вызова, батч остаётся доступным.
    pub fn take_for_commit(
        &self,
        token: &str,
        requested_kind: EntityKind,
        delimiter: Delimiter,
    ) -> Result<StagedBatch, ImportError> {
        let mut entries = self.entries.write().unwrap();
        let mut consumed = self.consumed.write().unwrap();

        let batch = match entries.get(token) {
            Some(b) => b,
            None => {
                if consumed.contains_key(token) {
                    return Err(ImportError::TokenAlreadyConsumed);
                }
                return Err(ImportError::TokenNotFound);
            }
        };

        if batch.expires_at <= Utc::now() {
            entries.remove(token);
            return Err(ImportError::TokenExpired);
        }

        if batch.entity_kind != requested_kind {
            return Err(ImportError::EntityKindMismatch {
                actual: batch.entity_kind,
                requested: requested_kind,
            });
        }

        if batch.delimiter != delimiter {
            return Err(ImportError::DelimiterMismatch {
                expected: batch.delimiter.as_str().to_string(),
                got: delimiter.as_str().to_string(),
            });
        }

        let batch = entries.remove(token).unwrap();
        consumed.insert(token.to_string(), Utc::now());
        Ok(batch)
    }

    /// Периодическая уборка: протухшие батчи и старые consumed-отметки.
    /// Возвращает число удалённых батчей.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();

        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, batch| batch.expires_at > now);
        let swept = before - entries.len();
        drop(entries);

        let consumed_deadline = now - self.ttl;
        let mut consumed = self.consumed.write().unwrap();
        consumed.retain(|_, at| *at > consumed_deadline);

        swept
    }

    #[cfg(test)]
    pub fn force_expire(&self, token: &str) {
        let mut entries = self.entries.write().unwrap();
        if let Some(batch) = entries.get_mut(token) {
            batch.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StagingStore {
        StagingStore::new(Duration::minutes(20))
    }

    fn stage(store: &StagingStore) -> String {
        store.put(EntityKind::Brand, Delimiter::Comma, false, Vec::new())
    }

    #[test]
    fn test_put_then_take() {
        let store = store();
        let token = stage(&store);
        let batch = store
            .take_for_commit(&token, EntityKind::Brand, Delimiter::Comma)
            .unwrap();
        assert_eq!(batch.token, token);
    }

    #[test]
    fn test_tokens_are_unique_and_opaque() {
        let store = store();
        let a = stage(&store);
        let b = stage(&store);
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_second_take_is_already_consumed() {
        let store = store();
        let token = stage(&store);
        store
            .take_for_commit(&token, EntityKind::Brand, Delimiter::Comma)
            .unwrap();
        assert!(matches!(
            store.take_for_commit(&token, EntityKind::Brand, Delimiter::Comma),
            Err(ImportError::TokenAlreadyConsumed)
        ));
    }

    #[test]
    fn test_unknown_token_is_not_found() {
        let store = store();
        assert!(matches!(
            store.take_for_commit("no-such-token", EntityKind::Brand, Delimiter::Comma),
            Err(ImportError::TokenNotFound)
        ));
    }

    #[test]
    fn test_expired_token() {
        let store = store();
        let token = stage(&store);
        store.force_expire(&token);
        assert!(matches!(
            store.take_for_commit(&token, EntityKind::Brand, Delimiter::Comma),
            Err(ImportError::TokenExpired)
        ));
        // После истечения — NotFound, не Expired (запись лениво удалена)
        assert!(matches!(
            store.take_for_commit(&token, EntityKind::Brand, Delimiter::Comma),
            Err(ImportError::TokenNotFound)
        ));
    }

    #[test]
    fn test_delimiter_mismatch_does_not_consume() {
        let store = store();
        let token = stage(&store);
        assert!(matches!(
            store.take_for_commit(&token, EntityKind::Brand, Delimiter::Semicolon),
            Err(ImportError::DelimiterMismatch { .. })
        ));
        // Токен всё ещё можно использовать с правильным разделителем
        assert!(store
            .take_for_commit(&token, EntityKind::Brand, Delimiter::Comma)
            .is_ok());
    }

    #[test]
    fn test_entity_kind_mismatch_does_not_consume() {
        let store = store();
        let token = stage(&store);
        assert!(matches!(
            store.take_for_commit(&token, EntityKind::Product, Delimiter::Comma),
            Err(ImportError::EntityKindMismatch { .. })
        ));
        assert!(store
            .take_for_commit(&token, EntityKind::Brand, Delimiter::Comma)
            .is_ok());
    }

    #[test]
    fn test_sweep_removes_expired_batches() {
        let store = store();
        let expired = stage(&store);
        let live = stage(&store);
        store.force_expire(&expired);

        assert_eq!(store.sweep_expired(), 1);
        assert!(matches!(
            store.take_for_commit(&expired, EntityKind::Brand, Delimiter::Comma),
            Err(ImportError::TokenNotFound)
        ));
        assert!(store
            .take_for_commit(&live, EntityKind::Brand, Delimiter::Comma)
            .is_ok());
    }
}

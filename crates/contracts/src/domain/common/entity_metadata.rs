use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Метаданные жизненного цикла записи
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Растёт при каждой перезаписи из фида; у новой записи 0
    pub version: i32,
}

impl EntityMetadata {
    /// Метаданные ещё не сохранённой записи
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Восстановить метаданные из строки БД; пустые даты заменяются текущим временем
    pub fn restored(
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
        version: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            created_at: created_at.unwrap_or(now),
            updated_at: updated_at.or(created_at).unwrap_or(now),
            version,
        }
    }

    /// Запись перезаписана новым содержимым
    pub fn mark_rewritten(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

impl Default for EntityMetadata {
    fn default() -> Self {
        Self::new()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Итог одного прогона импорта
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub run_id: String,
    pub status: ImportRunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Размер выбора
    pub total: i64,
    /// Сколько позиций пройдено (включая пропущенные)
    pub processed: i64,
    pub created: i64,
    pub updated: i64,
    /// Хэш не изменился, запись не перезаписывалась
    pub unchanged: i64,
    /// Продукт не удалось получить из API
    pub skipped: i64,

    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportRunStatus {
    /// Выбор пуст, прогон завершён сразу
    NothingToImport,
    /// Все позиции обработаны
    Completed,
    /// Прогон завершён, часть позиций пропущена
    CompletedWithSkips,
}

use crate::shared::data::transient;
use contracts::usecases::u501_import_equipment::ImportProgress;
use indicatif::{ProgressBar, ProgressStyle};
use sea_orm::DatabaseConnection;
use std::sync::Mutex;

pub const INDEXED_KEY: &str = "wp_bandit_progress_indexed";
pub const TOTAL_KEY: &str = "wp_bandit_progress_total";
pub const TEXT_KEY: &str = "wp_bandit_progress_text";

/// Трекер прогресса импорта.
///
/// Состояние живёт в `sys_transient` с ограниченным сроком, поэтому его видит
/// любой опрашивающий запрос, в том числе вскоре после завершения или падения
/// прогона. В CLI дополнительно ведёт счётчик шагов в терминале.
pub struct ProgressTracker {
    db: DatabaseConnection,
    ttl: chrono::Duration,
    interactive: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressTracker {
    pub fn new(db: DatabaseConnection, ttl_minutes: i64) -> Self {
        Self {
            db,
            ttl: chrono::Duration::minutes(ttl_minutes.max(1)),
            interactive: false,
            bar: Mutex::new(None),
        }
    }

    /// Трекер с индикатором в терминале (запуск из командной строки)
    pub fn interactive(db: DatabaseConnection, ttl_minutes: i64) -> Self {
        Self {
            interactive: true,
            ..Self::new(db, ttl_minutes)
        }
    }

    /// Начать прогон: индекс 0, новый total; пустой текст оставляет прежний
    pub async fn reset(&self, total: i64, text: &str) -> anyhow::Result<()> {
        transient::set(&self.db, INDEXED_KEY, &0i64, self.ttl).await?;
        transient::set(&self.db, TOTAL_KEY, &total, self.ttl).await?;
        if !text.is_empty() {
            transient::set(&self.db, TEXT_KEY, &text, self.ttl).await?;
        }

        if self.interactive {
            let bar = ProgressBar::new(total.max(0) as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar.set_message(text.to_string());
            if total <= 0 {
                bar.finish();
            }
            self.replace_bar(Some(bar));
        }
        Ok(())
    }

    /// Установить текущий индекс; при `index == total` прогон считается завершённым
    pub async fn advance(&self, index: i64) -> anyhow::Result<()> {
        transient::set(&self.db, INDEXED_KEY, &index, self.ttl).await?;

        if self.interactive {
            let total: Option<i64> = transient::get(&self.db, TOTAL_KEY).await?;
            if let Ok(guard) = self.bar.lock() {
                if let Some(bar) = guard.as_ref() {
                    bar.set_position(index.max(0) as u64);
                    if total == Some(index) {
                        bar.finish();
                    }
                }
            }
        }
        Ok(())
    }

    /// Обновить текст статуса, не трогая счётчики
    pub async fn set_text(&self, text: &str) -> anyhow::Result<()> {
        transient::set(&self.db, TEXT_KEY, &text, self.ttl).await?;
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                bar.set_message(text.to_string());
            }
        }
        Ok(())
    }

    /// Текущее состояние; до первого прогона и после истечения срока - пустые поля
    pub async fn read(&self) -> anyhow::Result<ImportProgress> {
        Ok(ImportProgress {
            indexed: transient::get(&self.db, INDEXED_KEY).await?,
            total: transient::get(&self.db, TOTAL_KEY).await?,
            text: transient::get(&self.db, TEXT_KEY).await?,
        })
    }

    fn replace_bar(&self, bar: Option<ProgressBar>) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(previous) = guard.take() {
                previous.finish_and_clear();
            }
            *guard = bar;
        }
    }
}

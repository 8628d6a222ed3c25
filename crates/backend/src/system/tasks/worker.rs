use anyhow::Result;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::usecases::u501_import_equipment::ImportExecutor;

/// Как часто воркер проверяет, не пора ли запускать импорт
const CHECK_INTERVAL_SECS: u64 = 30;

/// Фоновый воркер для импорта по расписанию (cron-выражение из конфигурации).
///
/// Прогон, запущенный другим триггером, не блокирует запуск по расписанию.
pub struct ScheduledImportWorker {
    executor: Arc<ImportExecutor>,
    schedule: Schedule,
}

impl ScheduledImportWorker {
    /// None, если расписание не задано
    pub fn from_config(executor: Arc<ImportExecutor>, expression: &str) -> Result<Option<Self>> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(None);
        }
        let schedule = Schedule::from_str(expression)
            .map_err(|e| anyhow::anyhow!("Invalid import schedule '{}': {}", expression, e))?;
        Ok(Some(Self { executor, schedule }))
    }

    /// Ближайший запуск строго после `after`
    pub fn next_run_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Запускает цикл проверки расписания.
    pub async fn run_loop(&self) {
        let mut next_run_at = self.next_run_after(Utc::now());
        info!(
            "Scheduled import worker started, next run at {}",
            next_run_at.map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
        );

        let mut interval = time::interval(time::Duration::from_secs(CHECK_INTERVAL_SECS));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if next_run_at.is_none() {
                info!("Import schedule has no upcoming runs, worker stops");
                return;
            }
            self.process_due(Utc::now(), &mut next_run_at).await;
        }
    }

    /// Запустить импорт, если время наступило, и вычислить следующий запуск
    async fn process_due(&self, now: DateTime<Utc>, next_run_at: &mut Option<DateTime<Utc>>) -> bool {
        match *next_run_at {
            Some(due) if due <= now => {}
            _ => return false,
        }

        info!("Scheduled import is due. Running...");
        match self.executor.run().await {
            Ok(response) => info!("Scheduled import finished: {}", response.message),
            Err(e) => error!("Scheduled import failed: {:?}", e),
        }
        *next_run_at = self.next_run_after(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::Config;
    use crate::shared::data::db::test_connection;
    use crate::usecases::u501_import_equipment::test_support::StubSource;
    use crate::usecases::u501_import_equipment::ProgressTracker;
    use chrono::TimeZone;

    async fn executor() -> Arc<ImportExecutor> {
        let db = test_connection().await;
        let tracker = Arc::new(ProgressTracker::new(db.clone(), 30));
        Arc::new(ImportExecutor::new(
            db,
            Arc::new(StubSource::default()),
            tracker,
            &Config::default(),
        ))
    }

    #[tokio::test]
    async fn empty_schedule_disables_worker() {
        assert!(ScheduledImportWorker::from_config(executor().await, "  ")
            .unwrap()
            .is_none());
        assert!(ScheduledImportWorker::from_config(executor().await, "every day").is_err());
    }

    #[tokio::test]
    async fn runs_only_when_due() {
        let worker = ScheduledImportWorker::from_config(executor().await, "0 0 3 * * *")
            .unwrap()
            .unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let three = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        assert_eq!(worker.next_run_after(midnight), Some(three));

        let mut next = Some(three);
        assert!(!worker.process_due(midnight, &mut next).await);
        assert_eq!(next, Some(three));

        assert!(worker.process_due(three, &mut next).await);
        assert_eq!(next, Some(three + chrono::Duration::days(1)));
    }
}

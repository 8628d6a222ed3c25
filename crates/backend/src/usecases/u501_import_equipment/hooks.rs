//! Точки расширения вокруг прогона импорта.
//!
//! Наблюдатели вызываются в порядке регистрации: `before_run` до выборки,
//! `after_run` после успешного завершения цикла. Пауза индексатора держится
//! guard-объектом и снимается даже при аварийном выходе из цикла.

use super::executor::ImportRun;
use async_trait::async_trait;
use contracts::usecases::u501_import_equipment::ImportResponse;
use std::sync::Arc;

/// Наблюдатель жизненного цикла прогона
#[async_trait]
pub trait RunObserver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn before_run(&self, _run: &ImportRun) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_run(&self, _run: &ImportRun, _outcome: &ImportResponse) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Внешний индексатор, который не должен видеть промежуточные записи
pub trait IndexingSubscriber: Send + Sync {
    fn pause(&self);
    fn resume(&self);
    /// Запустить переиндексацию накопленных изменений
    fn trigger(&self);
}

/// Индексатор по умолчанию: только пишет в лог
pub struct LoggingIndexer;

impl IndexingSubscriber for LoggingIndexer {
    fn pause(&self) {
        tracing::debug!("Indexing paused");
    }

    fn resume(&self) {
        tracing::debug!("Indexing resumed");
    }

    fn trigger(&self) {
        tracing::debug!("Indexing triggered");
    }
}

/// Пауза индексатора на время прогона; снимается в `finish` или при drop
pub struct IndexingPause {
    subscriber: Arc<dyn IndexingSubscriber>,
    active: bool,
}

impl IndexingPause {
    pub fn start(subscriber: Arc<dyn IndexingSubscriber>) -> Self {
        subscriber.pause();
        Self {
            subscriber,
            active: true,
        }
    }

    /// Штатное завершение: снять паузу и запустить индексацию
    pub fn finish(mut self) {
        self.active = false;
        self.subscriber.resume();
        self.subscriber.trigger();
    }
}

impl Drop for IndexingPause {
    fn drop(&mut self) {
        if self.active {
            tracing::warn!("Import run ended abnormally, resuming indexing");
            self.subscriber.resume();
        }
    }
}

/// Слой кэша страниц, который нужно сбросить после импорта
pub trait PageCache: Send + Sync {
    fn invalidate(&self);
}

/// Сброс кэша страниц после прогона
pub struct PageCacheInvalidator {
    cache: Arc<dyn PageCache>,
}

impl PageCacheInvalidator {
    pub fn new(cache: Arc<dyn PageCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl RunObserver for PageCacheInvalidator {
    fn name(&self) -> &'static str {
        "page_cache"
    }

    async fn after_run(&self, _run: &ImportRun, _outcome: &ImportResponse) -> anyhow::Result<()> {
        self.cache.invalidate();
        Ok(())
    }
}

/// Уведомление о завершении прогона; по умолчанию только запись в лог
pub struct CompletionNotifier;

#[async_trait]
impl RunObserver for CompletionNotifier {
    fn name(&self) -> &'static str {
        "completion_notifier"
    }

    async fn after_run(&self, run: &ImportRun, outcome: &ImportResponse) -> anyhow::Result<()> {
        tracing::info!(
            "Import {} finished: {} created, {} updated, {} unchanged, {} skipped",
            run.run_id,
            outcome.created,
            outcome.updated,
            outcome.unchanged,
            outcome.skipped
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingIndexer {
        calls: Mutex<Vec<&'static str>>,
    }

    impl IndexingSubscriber for RecordingIndexer {
        fn pause(&self) {
            self.calls.lock().unwrap().push("pause");
        }
        fn resume(&self) {
            self.calls.lock().unwrap().push("resume");
        }
        fn trigger(&self) {
            self.calls.lock().unwrap().push("trigger");
        }
    }

    #[test]
    fn finish_resumes_and_triggers_once() {
        let indexer = Arc::new(RecordingIndexer::default());
        IndexingPause::start(indexer.clone()).finish();
        assert_eq!(*indexer.calls.lock().unwrap(), vec!["pause", "resume", "trigger"]);
    }

    #[test]
    fn drop_without_finish_still_resumes() {
        let indexer = Arc::new(RecordingIndexer::default());
        {
            let _pause = IndexingPause::start(indexer.clone());
        }
        assert_eq!(*indexer.calls.lock().unwrap(), vec!["pause", "resume"]);
    }
}

use super::bandit_api_client::EquipmentSource;
use super::family_resolver::FamilyResolver;
use super::hooks::{IndexingPause, IndexingSubscriber, LoggingIndexer, RunObserver};
use super::progress_tracker::ProgressTracker;
use super::record_builder::RecordBuilder;
use super::selection;
use crate::domain::a001_equipment::{self, service::SaveOutcome};
use crate::shared::config::Config;
use chrono::{DateTime, Utc};
use contracts::domain::a001_equipment::aggregate::{Equipment, MediaKind};
use contracts::usecases::u501_import_equipment::{ImportResponse, ImportRunStatus, USECASE_NAME};
use sea_orm::DatabaseConnection;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const NOTHING_TO_IMPORT_TEXT: &str = "There isn't any equipment to import";
pub const IMPORTING_TEXT: &str = "Importing Equipment";

/// Фаза прогона: Idle -> Preparing -> Running -> Finalizing -> Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Preparing,
    Running,
    Finalizing,
}

/// Состояние одного прогона (существует только пока он идёт)
#[derive(Debug, Clone)]
pub struct ImportRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// ID продуктов Bandit в сохранённом порядке
    pub selection: Vec<i64>,
}

/// Итог обработки одной позиции выбора
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

#[derive(Debug, Default)]
struct RunCounters {
    processed: i64,
    created: i64,
    updated: i64,
    unchanged: i64,
    skipped: i64,
}

impl RunCounters {
    fn record(&mut self, outcome: ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::Updated => self.updated += 1,
            ItemOutcome::Unchanged => self.unchanged += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Executor для UseCase импорта техники из Bandit.
///
/// Все три триггера (расписание, HTTP, CLI) вызывают один и тот же `run`.
/// Параллельные прогоны не блокируются.
pub struct ImportExecutor {
    db: DatabaseConnection,
    source: Arc<dyn EquipmentSource>,
    pub progress_tracker: Arc<ProgressTracker>,
    resolver: FamilyResolver,
    builder: RecordBuilder,
    indexer: Arc<dyn IndexingSubscriber>,
    observers: Vec<Arc<dyn RunObserver>>,
    execution_budget: Duration,
    phase: Mutex<RunPhase>,
}

impl ImportExecutor {
    pub fn new(
        db: DatabaseConnection,
        source: Arc<dyn EquipmentSource>,
        progress_tracker: Arc<ProgressTracker>,
        config: &Config,
    ) -> Self {
        Self {
            resolver: FamilyResolver::new(db.clone(), source.clone(), &config.taxonomy),
            builder: RecordBuilder::new(db.clone(), config.taxonomy.post_type.clone()),
            db,
            source,
            progress_tracker,
            indexer: Arc::new(LoggingIndexer),
            observers: Vec::new(),
            execution_budget: Duration::from_secs(config.import.execution_budget_secs),
            phase: Mutex::new(RunPhase::Idle),
        }
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn IndexingSubscriber>) -> Self {
        self.indexer = indexer;
        self
    }

    /// Зарегистрировать наблюдателя; вызываются в порядке регистрации
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase.lock().map(|p| *p).unwrap_or(RunPhase::Idle)
    }

    fn set_phase(&self, phase: RunPhase) {
        if let Ok(mut current) = self.phase.lock() {
            tracing::debug!("Import phase {:?} -> {:?}", *current, phase);
            *current = phase;
        }
    }

    /// Выполнить импорт выбранных продуктов до конца
    pub async fn run(&self) -> anyhow::Result<ImportResponse> {
        let result = self.execute().await;
        self.set_phase(RunPhase::Idle);
        if let Err(e) = &result {
            tracing::error!("Import failed: {:#}", e);
        }
        result
    }

    async fn execute(&self) -> anyhow::Result<ImportResponse> {
        let started = Instant::now();
        let run = ImportRun {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            selection: Vec::new(),
        };

        self.set_phase(RunPhase::Preparing);
        let run = ImportRun {
            selection: selection::selected_ids(&self.db).await?,
            ..run
        };
        let total = run.selection.len() as i64;

        if run.selection.is_empty() {
            tracing::info!("Import {}: selection is empty", run.run_id);
            self.progress_tracker.reset(0, NOTHING_TO_IMPORT_TEXT).await?;
            return Ok(self.response(&run, ImportRunStatus::NothingToImport, RunCounters::default()));
        }

        tracing::info!(
            "{} {}: {} products selected, budget {}s",
            USECASE_NAME,
            run.run_id,
            total,
            self.execution_budget.as_secs()
        );
        for observer in &self.observers {
            if let Err(e) = observer.before_run(&run).await {
                tracing::warn!("Observer '{}' failed before run: {}", observer.name(), e);
            }
        }
        let pause = IndexingPause::start(self.indexer.clone());
        self.progress_tracker.reset(total, IMPORTING_TEXT).await?;

        self.set_phase(RunPhase::Running);
        let mut counters = RunCounters::default();
        for (index, external_id) in run.selection.iter().enumerate() {
            let outcome = self.import_one(*external_id).await?;
            counters.record(outcome);
            self.progress_tracker.advance(index as i64 + 1).await?;
        }

        self.set_phase(RunPhase::Finalizing);
        pause.finish();

        let status = if counters.skipped > 0 {
            ImportRunStatus::CompletedWithSkips
        } else {
            ImportRunStatus::Completed
        };
        let response = self.response(&run, status, counters);
        for observer in &self.observers {
            if let Err(e) = observer.after_run(&run, &response).await {
                tracing::warn!("Observer '{}' failed after run: {}", observer.name(), e);
            }
        }

        let elapsed = started.elapsed();
        if elapsed > self.execution_budget {
            tracing::warn!(
                "Import {} took {}s, over the {}s budget",
                run.run_id,
                elapsed.as_secs(),
                self.execution_budget.as_secs()
            );
        }
        tracing::info!("Import {} completed in {:.1}s", run.run_id, elapsed.as_secs_f64());
        Ok(response)
    }

    /// fetch -> build -> семейства -> запись, если хэш изменился
    async fn import_one(&self, external_id: i64) -> anyhow::Result<ItemOutcome> {
        let Some(product) = self.source.get_product(external_id).await else {
            tracing::warn!("Product {} is unavailable, skipping", external_id);
            return Ok(ItemOutcome::Skipped);
        };

        let mut prepared = self.builder.build(&product).await?;
        let families = self.resolver.resolve_all(&product.category_ids).await?;

        if prepared.is_unchanged() {
            tracing::debug!("Product {} unchanged", external_id);
            return Ok(ItemOutcome::Unchanged);
        }

        prepared.record.set_families(families);
        self.resolve_media(&mut prepared.record).await;

        let outcome = match a001_equipment::service::save(&self.db, &mut prepared.record).await? {
            SaveOutcome::Created(_) => ItemOutcome::Created,
            SaveOutcome::Updated(_) => ItemOutcome::Updated,
        };
        tracing::debug!("Product {} saved: {:?}", external_id, outcome);
        Ok(outcome)
    }

    /// URL изображений и документа по ID медиа; неразрешённые остаются пустыми
    async fn resolve_media(&self, record: &mut Equipment) {
        for item in record.media_items.iter_mut() {
            if item.kind == MediaKind::Video || item.resolved_url.is_some() {
                continue;
            }
            let Ok(media_id) = item.source_ref.parse::<i64>() else {
                tracing::debug!("Media ref '{}' is not an id", item.source_ref);
                continue;
            };
            item.resolved_url = self
                .source
                .get_media(media_id)
                .await
                .map(|media| media.source_url)
                .filter(|url| !url.is_empty());
        }
    }

    fn response(&self, run: &ImportRun, status: ImportRunStatus, counters: RunCounters) -> ImportResponse {
        let total = run.selection.len() as i64;
        let message = match status {
            ImportRunStatus::NothingToImport => NOTHING_TO_IMPORT_TEXT.to_string(),
            ImportRunStatus::Completed => format!("Imported {} of {} products", counters.processed, total),
            ImportRunStatus::CompletedWithSkips => format!(
                "Imported {} of {} products, {} skipped",
                counters.processed - counters.skipped,
                total,
                counters.skipped
            ),
        };

        ImportResponse {
            run_id: run.run_id.to_string(),
            status,
            started_at: run.started_at,
            finished_at: Utc::now(),
            total,
            processed: counters.processed,
            created: counters.created,
            updated: counters.updated,
            unchanged: counters.unchanged,
            skipped: counters.skipped,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a002_equipment_family;
    use crate::shared::data::db::test_connection;
    use crate::usecases::u501_import_equipment::hooks::{PageCache, PageCacheInvalidator};
    use crate::usecases::u501_import_equipment::test_support::StubSource;
    use contracts::usecases::u501_import_equipment::ImportProgress;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn product_101() -> serde_json::Value {
        json!({
            "id": 101,
            "link": "https://banditchippers.com/project/101/",
            "project_category": [9],
            "acf": { "product_main_title": "Model 90XP", "product_description": "<p>Drum</p>" }
        })
    }

    fn executor(db: &DatabaseConnection, source: Arc<StubSource>) -> ImportExecutor {
        let tracker = Arc::new(ProgressTracker::new(db.clone(), 30));
        ImportExecutor::new(db.clone(), source, tracker, &Config::default())
    }

    #[tokio::test]
    async fn second_run_with_same_payloads_writes_nothing() {
        let db = test_connection().await;
        selection::save_selection(&db, &[101, 102]).await.unwrap();
        let source = Arc::new(
            StubSource::default()
                .with_category(9, "Hand-Fed Chippers")
                .with_product(product_101())
                .with_product(json!({ "id": 102, "project_category": [9],
                                      "acf": { "product_main_title": "Model 200" } })),
        );
        let executor = executor(&db, source);

        let first = executor.run().await.unwrap();
        assert_eq!(first.status, ImportRunStatus::Completed);
        assert_eq!((first.created, first.updated, first.unchanged), (2, 0, 0));
        assert_eq!(a002_equipment_family::service::count(&db).await.unwrap(), 1);
        let stored = a001_equipment::service::find_by_external_id(&db, 101)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.families.len(), 1);
        assert_eq!(stored.families[0].name, "Hand-Fed Chippers");

        let second = executor.run().await.unwrap();
        assert_eq!((second.created, second.updated, second.unchanged), (0, 0, 2));
        assert_eq!(a002_equipment_family::service::count(&db).await.unwrap(), 1);
        assert_eq!(a001_equipment::service::count(&db).await.unwrap(), 2);

        let again = a001_equipment::service::find_by_external_id(&db, 101)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.local_id, stored.local_id);
        assert_eq!(again.metadata.version, 0);
        assert_eq!(executor.phase(), RunPhase::Idle);
    }

    #[tokio::test]
    async fn changed_payload_updates_in_place() {
        let db = test_connection().await;
        selection::save_selection(&db, &[101]).await.unwrap();
        let source = Arc::new(
            StubSource::default()
                .with_category(9, "Hand-Fed Chippers")
                .with_product(product_101()),
        );
        let executor = executor(&db, source.clone());
        executor.run().await.unwrap();
        let before = a001_equipment::service::find_by_external_id(&db, 101)
            .await
            .unwrap()
            .unwrap();

        let mut changed = product_101();
        changed["modified"] = json!("2024-05-01T10:00:00");
        source.replace_product(changed);
        let response = executor.run().await.unwrap();
        assert_eq!((response.created, response.updated), (0, 1));

        let after = a001_equipment::service::find_by_external_id(&db, 101)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.local_id, before.local_id);
        assert_ne!(after.content_hash, before.content_hash);
        assert_eq!(after.metadata.version, 1);
    }

    #[tokio::test]
    async fn empty_selection_goes_straight_to_idle() {
        let db = test_connection().await;
        let executor = executor(&db, Arc::new(StubSource::default()));

        let response = executor.run().await.unwrap();
        assert_eq!(response.status, ImportRunStatus::NothingToImport);
        assert_eq!(response.total, 0);

        let progress = executor.progress_tracker.read().await.unwrap();
        assert_eq!(progress.total, Some(0));
        assert_eq!(progress.text.as_deref(), Some(NOTHING_TO_IMPORT_TEXT));
        assert_eq!(executor.phase(), RunPhase::Idle);
    }

    #[tokio::test]
    async fn failed_fetch_is_skipped_but_counted_in_progress() {
        let db = test_connection().await;
        selection::save_selection(&db, &[101, 102]).await.unwrap();
        let source = Arc::new(
            StubSource::default()
                .with_category(9, "Hand-Fed Chippers")
                .with_product(product_101()),
        );
        let executor = executor(&db, source);

        let response = executor.run().await.unwrap();
        assert_eq!(response.status, ImportRunStatus::CompletedWithSkips);
        assert_eq!((response.processed, response.created, response.skipped), (2, 1, 1));
        assert!(a001_equipment::service::find_by_external_id(&db, 101)
            .await
            .unwrap()
            .is_some());

        let progress = executor.progress_tracker.read().await.unwrap();
        assert_eq!(
            progress,
            ImportProgress {
                indexed: Some(2),
                total: Some(2),
                text: Some(IMPORTING_TEXT.to_string()),
            }
        );
    }

    #[tokio::test]
    async fn media_is_resolved_only_for_written_records() {
        let db = test_connection().await;
        selection::save_selection(&db, &[101]).await.unwrap();
        let mut payload = product_101();
        payload["acf"]["product_image_carousel_1"] = json!(501);
        payload["acf"]["product_image_carousel_2"] = json!(502);
        payload["acf"]["product_specs"] = json!(777);
        let source = Arc::new(
            StubSource::default()
                .with_category(9, "Hand-Fed Chippers")
                .with_product(payload)
                .with_media(501, "https://cdn.example/501.jpg")
                .with_media(777, "https://cdn.example/specs.pdf"),
        );
        let executor = executor(&db, source.clone());

        executor.run().await.unwrap();
        assert_eq!(source.media_calls(), 3);

        let stored = a001_equipment::service::find_by_external_id(&db, 101)
            .await
            .unwrap()
            .unwrap();
        let urls: Vec<Option<&str>> = stored
            .media_items
            .iter()
            .map(|m| m.resolved_url.as_deref())
            .collect();
        assert_eq!(
            urls,
            vec![
                Some("https://cdn.example/501.jpg"),
                None,
                Some("https://cdn.example/specs.pdf")
            ]
        );

        executor.run().await.unwrap();
        assert_eq!(source.media_calls(), 3);
    }

    struct CountingCache(AtomicUsize);

    impl PageCache for CountingCache {
        fn invalidate(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn observers_run_after_completed_runs_only() {
        let db = test_connection().await;
        let cache = Arc::new(CountingCache(AtomicUsize::new(0)));
        let executor = executor(&db, Arc::new(StubSource::default().with_product(product_101())))
            .with_observer(Arc::new(PageCacheInvalidator::new(cache.clone())));

        executor.run().await.unwrap();
        assert_eq!(cache.0.load(Ordering::SeqCst), 0);

        selection::save_selection(&db, &[101]).await.unwrap();
        executor.run().await.unwrap();
        assert_eq!(cache.0.load(Ordering::SeqCst), 1);
    }

    #[derive(Default)]
    struct RecordingIndexer(Mutex<Vec<&'static str>>);

    impl IndexingSubscriber for RecordingIndexer {
        fn pause(&self) {
            self.0.lock().unwrap().push("pause");
        }
        fn resume(&self) {
            self.0.lock().unwrap().push("resume");
        }
        fn trigger(&self) {
            self.0.lock().unwrap().push("trigger");
        }
    }

    #[tokio::test]
    async fn indexing_is_paused_for_the_whole_loop() {
        let db = test_connection().await;
        selection::save_selection(&db, &[101]).await.unwrap();
        let indexer = Arc::new(RecordingIndexer::default());
        let executor = executor(&db, Arc::new(StubSource::default().with_product(product_101())))
            .with_indexer(indexer.clone());

        executor.run().await.unwrap();
        assert_eq!(*indexer.0.lock().unwrap(), vec!["pause", "resume", "trigger"]);
    }

    #[tokio::test]
    async fn storage_failure_mid_loop_resumes_indexing_without_trigger() {
        use sea_orm::ConnectionTrait;

        let db = test_connection().await;
        selection::save_selection(&db, &[101]).await.unwrap();
        db.execute_unprepared("DROP TABLE a001_equipment_family_link")
            .await
            .unwrap();
        let indexer = Arc::new(RecordingIndexer::default());
        let executor = executor(&db, Arc::new(StubSource::default().with_product(product_101())))
            .with_indexer(indexer.clone());

        assert!(executor.run().await.is_err());
        assert_eq!(*indexer.0.lock().unwrap(), vec!["pause", "resume"]);
        assert_eq!(executor.phase(), RunPhase::Idle);
        assert!(a001_equipment::service::stored_state(&db, 101)
            .await
            .unwrap()
            .is_none());
    }
}

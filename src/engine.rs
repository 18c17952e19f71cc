use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::vocabulary::VocabularyCorpus;
use crate::modes::builtin::register_builtin_modes;
use crate::modes::events::EventBus;
use crate::modes::manager::ModeLifecycleManager;
use crate::modes::surface::{NullSurface, Surface};
use crate::services::clock::{Clock, SystemClock};
use crate::services::partitioner::DifficultyPartitioner;
use crate::services::progress::SessionProgressStore;
use crate::services::scheduler::{IntervalPolicy, ReviewScheduler};
use crate::storage::factory::StoreFactory;
use crate::storage::kv::KeyValueStore;
use crate::storage::memory::MemoryStore;

/// Engine state containing all shared services
#[derive(Clone)]
pub struct Engine {
    pub config: AppConfig,
    /// Vocabulary corpus, read-only after load
    pub corpus: Arc<VocabularyCorpus>,
    /// Backing key-value store
    pub store: Arc<dyn KeyValueStore>,
    pub partitioner: DifficultyPartitioner,
    /// Review records and due queries
    pub scheduler: Arc<ReviewScheduler>,
    /// Completed sessions
    pub progress: Arc<SessionProgressStore>,
    /// Mode registry and lifecycle
    pub manager: Arc<ModeLifecycleManager>,
    pub events: EventBus,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("app_name", &self.config.app_name)
            .field("categories", &self.corpus.categories.len())
            .field("store", &"Arc<dyn KeyValueStore>")
            .field("partitioner", &self.partitioner)
            .field("scheduler", &"Arc<ReviewScheduler>")
            .field("progress", &"Arc<SessionProgressStore>")
            .field("manager", &"Arc<ModeLifecycleManager>")
            .field("subscribers", &self.events.subscriber_count())
            .finish()
    }
}

impl Engine {
    /// Wire every service over the given store, corpus and clock.
    /// Built-in modes are registered.
    pub fn new(
        config: AppConfig,
        corpus: VocabularyCorpus,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        surface: Arc<dyn Surface>,
    ) -> Result<Self> {
        let corpus = Arc::new(corpus);
        let partitioner = DifficultyPartitioner::new(config.session.page_size)?;
        let policy = IntervalPolicy::from_config(&config.review)?;
        let events = EventBus::new(config.events.capacity);

        let scheduler = Arc::new(ReviewScheduler::new(
            store.clone(),
            corpus.clone(),
            clock.clone(),
            policy,
        ));
        let progress = Arc::new(SessionProgressStore::new(
            store.clone(),
            corpus.clone(),
            partitioner,
            clock.clone(),
        ));

        let manager = ModeLifecycleManager::builder(corpus.clone(), store.clone(), partitioner)
            .scheduler(scheduler.clone())
            .progress(progress.clone())
            .clock(clock.clone())
            .events(events.clone())
            .recommendation(config.recommendation.clone())
            .default_surface(surface)
            .build();
        register_builtin_modes(manager.registry());

        tracing::info!(
            "Engine ready: {} categories, {} items, page size {}",
            corpus.categories.len(),
            corpus.item_count(),
            partitioner.page_size()
        );

        Ok(Self {
            config,
            corpus,
            store,
            partitioner,
            scheduler,
            progress,
            manager,
            events,
            clock,
        })
    }

    /// In-memory engine on the system clock with development defaults
    pub fn development(corpus: VocabularyCorpus) -> Result<Self> {
        Self::new(
            AppConfig::development(),
            corpus,
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            Arc::new(NullSurface),
        )
    }

    /// Build the store and load the corpus named in the configuration
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let store = StoreFactory::create(&config.storage).await?;
        let corpus = VocabularyCorpus::from_file(&config.session.corpus_path).await?;
        Self::new(
            config,
            corpus,
            store,
            Arc::new(SystemClock),
            Arc::new(NullSurface),
        )
    }
}

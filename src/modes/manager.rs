//! Mode Lifecycle Manager
//!
//! Hosts at most one active learning mode:
//!
//! ```text
//! Idle -> Starting -> Active -> Stopping -> Idle
//! ```
//!
//! - `start` stops whatever is active first, then resolves, checks
//!   dependencies, normalizes input and runs `init` + `render`
//! - `stop` always ends in `Idle`; cleanup failures are logged only
//! - `switch` saves the outgoing mode's state and hands it to the next start
//!
//! Lifecycle calls are serialized through one async mutex, so overlapping
//! callers queue up instead of interleaving.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::config::config::RecommendationConfig;
use crate::error::{AppError, ErrorResponse, Result};
use crate::models::mode::{
    LifecycleState, ModeAction, ModeData, ModeDescriptor, ModeMetrics, ModeOptions, ModeOutcome,
    Recommendation, SavedState,
};
use crate::models::progress::UserProgress;
use crate::models::vocabulary::VocabularyCorpus;
use crate::modes::events::{EventBus, EventSubscriber, ModeEvent};
use crate::modes::metrics::ModeMetricsStore;
use crate::modes::recommend::recommend_next;
use crate::modes::registry::ModeRegistry;
use crate::modes::surface::{NullSurface, Surface};
use crate::modes::unit::{LearningModeUnit, ModeContext};
use crate::services::clock::{Clock, SystemClock};
use crate::services::partitioner::{DifficultyPartitioner, sort_by_tier};
use crate::services::progress::SessionProgressStore;
use crate::services::scheduler::ReviewScheduler;
use crate::storage::kv::KeyValueStore;

/// Capability provided when a review scheduler is attached
pub const CAPABILITY_SPACED_REPETITION: &str = "spaced-repetition";
/// Capability provided when a progress store is attached
pub const CAPABILITY_SESSION_PROGRESS: &str = "session-progress";

/// A dependency a mode can declare
#[derive(Clone)]
pub enum Capability {
    Flag(bool),
    Check(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Capability {
    fn is_available(&self) -> bool {
        match self {
            Capability::Flag(available) => *available,
            Capability::Check(check) => check(),
        }
    }
}

/// Mode id plus the session (or category) its state belongs to
type StashKey = (String, Option<String>);

fn stash_scope(data: &ModeData) -> Option<String> {
    data.session
        .as_ref()
        .map(|session| session.session_id.clone())
        .or_else(|| data.category_id.clone())
}

struct ActiveMode {
    mode_id: String,
    instance_id: String,
    scope: Option<String>,
    unit: Box<dyn LearningModeUnit>,
    started_at: DateTime<Utc>,
    interactions: u64,
}

pub struct ModeLifecycleManager {
    registry: ModeRegistry,
    events: EventBus,
    corpus: Arc<VocabularyCorpus>,
    partitioner: DifficultyPartitioner,
    scheduler: Option<Arc<ReviewScheduler>>,
    progress: Option<Arc<SessionProgressStore>>,
    metrics: ModeMetricsStore,
    clock: Arc<dyn Clock>,
    recommendation: RecommendationConfig,
    capabilities: RwLock<HashMap<String, Capability>>,
    surfaces: RwLock<HashMap<String, Arc<dyn Surface>>>,
    default_surface: Arc<dyn Surface>,
    /// States saved by `switch`, only live across a chain of switches
    saved_states: Mutex<HashMap<StashKey, Value>>,
    state: RwLock<LifecycleState>,
    slot: tokio::sync::Mutex<Option<ActiveMode>>,
    handle: Weak<ModeLifecycleManager>,
}

/// Builder for [`ModeLifecycleManager`]
pub struct ManagerBuilder {
    corpus: Arc<VocabularyCorpus>,
    store: Arc<dyn KeyValueStore>,
    partitioner: DifficultyPartitioner,
    scheduler: Option<Arc<ReviewScheduler>>,
    progress: Option<Arc<SessionProgressStore>>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    recommendation: RecommendationConfig,
    default_surface: Arc<dyn Surface>,
}

impl ManagerBuilder {
    pub fn partitioner(mut self, partitioner: DifficultyPartitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<ReviewScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn progress(mut self, progress: Arc<SessionProgressStore>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn recommendation(mut self, recommendation: RecommendationConfig) -> Self {
        self.recommendation = recommendation;
        self
    }

    pub fn default_surface(mut self, surface: Arc<dyn Surface>) -> Self {
        self.default_surface = surface;
        self
    }

    pub fn build(self) -> Arc<ModeLifecycleManager> {
        let mut capabilities = HashMap::new();
        capabilities.insert(
            CAPABILITY_SPACED_REPETITION.to_string(),
            Capability::Flag(self.scheduler.is_some()),
        );
        capabilities.insert(
            CAPABILITY_SESSION_PROGRESS.to_string(),
            Capability::Flag(self.progress.is_some()),
        );

        Arc::new_cyclic(|handle| ModeLifecycleManager {
            registry: ModeRegistry::new(self.events.clone()),
            events: self.events,
            corpus: self.corpus,
            partitioner: self.partitioner,
            scheduler: self.scheduler,
            progress: self.progress,
            metrics: ModeMetricsStore::new(self.store),
            clock: self.clock,
            recommendation: self.recommendation,
            capabilities: RwLock::new(capabilities),
            surfaces: RwLock::new(HashMap::new()),
            default_surface: self.default_surface,
            saved_states: Mutex::new(HashMap::new()),
            state: RwLock::new(LifecycleState::Idle),
            slot: tokio::sync::Mutex::new(None),
            handle: handle.clone(),
        })
    }
}

impl ModeLifecycleManager {
    pub fn builder(
        corpus: Arc<VocabularyCorpus>,
        store: Arc<dyn KeyValueStore>,
        partitioner: DifficultyPartitioner,
    ) -> ManagerBuilder {
        ManagerBuilder {
            corpus,
            store,
            partitioner,
            scheduler: None,
            progress: None,
            clock: Arc::new(SystemClock),
            events: EventBus::default(),
            recommendation: crate::config::AppConfig::development().recommendation,
            default_surface: Arc::new(NullSurface),
        }
    }

    // === 注册表与依赖 ===

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> &ModeMetricsStore {
        &self.metrics
    }

    /// Remove a mode kind, stopping it first when it is the active one
    pub async fn unregister(&self, mode_id: &str) -> Option<ModeDescriptor> {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|active| active.mode_id == mode_id) {
            self.stop_locked(&mut slot).await;
        }
        self.saved_states.lock().retain(|(id, _), _| id != mode_id);
        self.registry.remove(mode_id)
    }

    pub fn provide_capability(&self, name: &str, available: bool) {
        self.capabilities
            .write()
            .insert(name.to_string(), Capability::Flag(available));
    }

    pub fn provide_check<F>(&self, name: &str, check: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.capabilities
            .write()
            .insert(name.to_string(), Capability::Check(Arc::new(check)));
    }

    pub fn revoke_capability(&self, name: &str) {
        self.capabilities.write().remove(name);
    }

    pub fn has_capability(&self, name: &str) -> bool {
        // clone out of the lock so a check never runs under it
        let capability = self.capabilities.read().get(name).cloned();
        capability.is_some_and(|c| c.is_available())
    }

    pub fn register_surface(&self, name: &str, surface: Arc<dyn Surface>) {
        self.surfaces.write().insert(name.to_string(), surface);
    }

    // === 状态查询 ===

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    fn set_state(&self, state: LifecycleState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        tracing::debug!("Lifecycle {} -> {}", previous, state);
    }

    pub async fn active_mode_id(&self) -> Option<String> {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|active| active.mode_id.clone())
    }

    pub async fn is_active(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    // === 生命周期 ===

    /// Start a mode, stopping the active one first.
    ///
    /// A plain start is always fresh: states saved by earlier switches are dropped.
    pub async fn start(&self, mode_id: &str, data: ModeData, options: ModeOptions) -> Result<()> {
        let mut slot = self.slot.lock().await;
        self.saved_states.lock().clear();
        self.start_locked(&mut slot, mode_id, data, options, true)
            .await
    }

    /// Stop the active mode; returns false when nothing was running
    pub async fn stop(&self) -> bool {
        let mut slot = self.slot.lock().await;
        self.saved_states.lock().clear();
        self.stop_locked(&mut slot).await
    }

    /// Stop the active mode and start another, carrying over the saved state
    pub async fn switch(&self, mode_id: &str, data: ModeData, mut options: ModeOptions) -> Result<()> {
        let mut slot = self.slot.lock().await;

        // the outgoing state is for the incoming mode to read; it is only
        // restored through the scoped stash
        let mut caller_state = true;
        if let Some(active) = slot.as_ref() {
            if let Some(state) = active.unit.save_state() {
                self.saved_states.lock().insert(
                    (active.mode_id.clone(), active.scope.clone()),
                    state.clone(),
                );
                options.previous_state = Some(SavedState {
                    mode_id: active.mode_id.clone(),
                    state,
                });
                caller_state = false;
            }
        }

        self.start_locked(&mut slot, mode_id, data, options, caller_state)
            .await
    }

    /// Forward an interaction to the active mode.
    ///
    /// Errors raised by the mode are returned as-is and not broadcast.
    pub async fn interact(&self, action: ModeAction) -> Result<ModeOutcome> {
        let mut slot = self.slot.lock().await;
        let active = slot
            .as_mut()
            .ok_or_else(|| AppError::NotFound("No active mode".to_string()))?;
        active.interactions += 1;
        active.unit.handle(action).await
    }

    /// Redraw the active mode
    pub async fn render(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let active = slot
            .as_mut()
            .ok_or_else(|| AppError::NotFound("No active mode".to_string()))?;
        active.unit.render().await
    }

    async fn start_locked(
        &self,
        slot: &mut Option<ActiveMode>,
        mode_id: &str,
        data: ModeData,
        options: ModeOptions,
        restore_previous: bool,
    ) -> Result<()> {
        if slot.is_some() {
            self.stop_locked(slot).await;
        }

        self.set_state(LifecycleState::Starting);
        tracing::info!("Starting mode {}", mode_id);

        match self
            .launch(mode_id, data, options.clone(), restore_previous)
            .await
        {
            Ok((active, data)) => {
                let instance_id = active.instance_id.clone();
                *slot = Some(active);
                self.set_state(LifecycleState::Active);
                self.events.publish(ModeEvent::ModeStarted {
                    mode_id: mode_id.to_string(),
                    data,
                    options,
                });
                tracing::info!("Mode {} active (instance {})", mode_id, instance_id);
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::Idle);
                tracing::warn!("Mode {} failed to start: {}", mode_id, e);
                self.events.publish(ModeEvent::ModeError {
                    mode_id: mode_id.to_string(),
                    error: ErrorResponse::from(&e),
                });
                Err(e)
            }
        }
    }

    async fn launch(
        &self,
        mode_id: &str,
        data: ModeData,
        options: ModeOptions,
        restore_previous: bool,
    ) -> Result<(ActiveMode, ModeData)> {
        let (descriptor, factory) = self.registry.resolve(mode_id)?;
        if !descriptor.enabled {
            return Err(AppError::Disabled(mode_id.to_string()));
        }
        self.check_dependencies(&descriptor)?;

        let data = self.normalize(data)?;
        let surface = self.resolve_surface(
            options
                .surface
                .as_deref()
                .or(descriptor.default_surface.as_deref()),
        );
        let instance_id = Uuid::new_v4().to_string();

        let ctx = ModeContext {
            mode_id: mode_id.to_string(),
            instance_id: instance_id.clone(),
            data: data.clone(),
            options: options.clone(),
            events: self.events.clone(),
            manager: self.handle.clone(),
            scheduler: self.scheduler.clone(),
            progress: self.progress.clone(),
            clock: self.clock.clone(),
            surface,
        };

        let mut unit = factory(ctx)?;
        let scope = stash_scope(&data);

        if let Err(e) = self
            .initialize(unit.as_mut(), mode_id, &scope, &options, restore_previous)
            .await
        {
            if let Err(cleanup_err) = unit.cleanup().await {
                tracing::warn!(
                    "Cleanup after failed start of {} also failed: {}",
                    mode_id,
                    cleanup_err
                );
            }
            return Err(e);
        }

        let active = ActiveMode {
            mode_id: mode_id.to_string(),
            instance_id,
            scope,
            unit,
            started_at: self.clock.now(),
            interactions: 0,
        };
        Ok((active, data))
    }

    /// `init`, optional restore, then `render`; `render` is skipped when `init` fails
    async fn initialize(
        &self,
        unit: &mut dyn LearningModeUnit,
        mode_id: &str,
        scope: &Option<String>,
        options: &ModeOptions,
        restore_previous: bool,
    ) -> Result<()> {
        unit.init().await?;

        // a state saved for another session or category never applies here
        let restored = match &options.previous_state {
            Some(saved) if restore_previous && saved.mode_id == mode_id => {
                Some(saved.state.clone())
            }
            _ => self
                .saved_states
                .lock()
                .remove(&(mode_id.to_string(), scope.clone())),
        };
        if let Some(state) = restored {
            unit.restore_state(&state)?;
            tracing::debug!("Restored saved state for {}", mode_id);
        }

        unit.render().await
    }

    async fn stop_locked(&self, slot: &mut Option<ActiveMode>) -> bool {
        let Some(mut active) = slot.take() else {
            return false;
        };

        self.set_state(LifecycleState::Stopping);
        tracing::info!("Stopping mode {}", active.mode_id);

        let usage = active.unit.usage();

        if let Err(e) = active.unit.cleanup().await {
            tracing::warn!("Cleanup of {} failed, stopping anyway: {}", active.mode_id, e);
        }

        let now = self.clock.now();
        let elapsed = (now - active.started_at).num_milliseconds().max(0) as u64;
        let delta = ModeMetrics {
            mode_id: active.mode_id.clone(),
            sessions_run: 1,
            total_active_ms: elapsed,
            last_used: Some(now),
            interactions: active.interactions,
            items_seen: usage.items_seen,
            ratings: usage.ratings,
        };
        if let Err(e) = self.metrics.record(&delta).await {
            tracing::warn!("Could not persist metrics for {}: {}", active.mode_id, e);
        }

        self.events.publish(ModeEvent::ModeStopped {
            mode_id: active.mode_id.clone(),
        });
        self.set_state(LifecycleState::Idle);
        true
    }

    fn check_dependencies(&self, descriptor: &ModeDescriptor) -> Result<()> {
        match descriptor
            .dependencies
            .iter()
            .find(|dependency| !self.has_capability(dependency))
        {
            Some(missing) => Err(AppError::DependencyUnmet {
                mode_id: descriptor.id.clone(),
                dependency: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Expand a session or category reference into concrete items
    fn normalize(&self, mut data: ModeData) -> Result<ModeData> {
        if let Some(session_id) = data.session_id.clone() {
            let (session, total) = self.partitioner.find_session(&self.corpus, &session_id)?;
            data.category_id = Some(session.category_id.clone());
            data.session = Some(session.info(total));
            data.words = session.items;
        } else if let Some(category_id) = data.category_id.as_deref() {
            let category = self.corpus.category(category_id).ok_or_else(|| {
                AppError::NotFound(format!("Category not found: {}", category_id))
            })?;
            data.words = sort_by_tier(&category.items);
        }
        Ok(data)
    }

    fn resolve_surface(&self, name: Option<&str>) -> Arc<dyn Surface> {
        match name {
            Some(name) => match self.surfaces.read().get(name) {
                Some(surface) => surface.clone(),
                None => {
                    tracing::warn!("Surface {} not registered, using default", name);
                    self.default_surface.clone()
                }
            },
            None => self.default_surface.clone(),
        }
    }

    // === 推荐 ===

    pub async fn user_progress(&self) -> UserProgress {
        match &self.scheduler {
            Some(scheduler) => UserProgress {
                struggling_items: scheduler.struggling_count().await,
                learned_items: scheduler.learned_count().await,
            },
            None => UserProgress::default(),
        }
    }

    pub fn recommend_next(&self, progress: &UserProgress) -> Recommendation {
        recommend_next(progress, &self.recommendation)
    }

    /// Recommendation from the scheduler's current records
    pub async fn recommend(&self) -> Recommendation {
        let progress = self.user_progress().await;
        self.recommend_next(&progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::vocabulary::VocabularyItem;
    use crate::storage::memory::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test mode whose behavior is scripted per instance
    struct ScriptedMode {
        id: String,
        fail_init: bool,
        fail_cleanup: bool,
        position: u64,
        renders: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LearningModeUnit for ScriptedMode {
        fn mode_id(&self) -> &str {
            &self.id
        }

        async fn init(&mut self) -> Result<()> {
            if self.fail_init {
                return Err(AppError::MissingData {
                    mode_id: self.id.clone(),
                    fields: vec!["words".into()],
                });
            }
            Ok(())
        }

        async fn render(&mut self) -> Result<()> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn cleanup(&mut self) -> Result<()> {
            if self.fail_cleanup {
                return Err(AppError::Internal("wedged".into()));
            }
            Ok(())
        }

        async fn handle(&mut self, _action: ModeAction) -> Result<ModeOutcome> {
            self.position += 1;
            Ok(ModeOutcome::Continue)
        }

        fn save_state(&self) -> Option<Value> {
            Some(serde_json::json!({ "position": self.position }))
        }

        fn restore_state(&mut self, state: &Value) -> Result<()> {
            self.position = state["position"].as_u64().unwrap_or(0);
            Ok(())
        }
    }

    fn manager() -> (Arc<ModeLifecycleManager>, Arc<AtomicUsize>) {
        let corpus = Arc::new(VocabularyCorpus::new().with_category(
            "animals",
            (0..23)
                .map(|i| VocabularyItem::new(&format!("a{}", i), &format!("animal{:02}", i), "", 1))
                .collect(),
        ));
        let manager = ModeLifecycleManager::builder(
            corpus,
            Arc::new(MemoryStore::new()),
            DifficultyPartitioner::new(10).unwrap(),
        )
        .build();

        let renders = Arc::new(AtomicUsize::new(0));
        for (id, fail_init, fail_cleanup) in [
            ("alpha", false, false),
            ("beta", false, false),
            ("broken", true, false),
            ("wedged", false, true),
        ] {
            let renders = renders.clone();
            manager
                .registry()
                .register_fn(ModeDescriptor::new(id, id), move |ctx| {
                    Ok(Box::new(ScriptedMode {
                        id: ctx.mode_id.clone(),
                        fail_init,
                        fail_cleanup,
                        position: 0,
                        renders: renders.clone(),
                    }))
                });
        }
        (manager, renders)
    }

    #[tokio::test]
    async fn test_start_unknown_mode_leaves_idle() {
        let (manager, _) = manager();
        let err = manager
            .start("nope", ModeData::default(), ModeOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(manager.state(), LifecycleState::Idle);
        assert!(!manager.is_active().await);

        manager
            .start("alpha", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        assert_eq!(manager.state(), LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_init_failure_skips_render() {
        let (manager, renders) = manager();
        let mut errors = manager.events().subscribe_to(&["mode:error"]);

        let err = manager
            .start("broken", ModeData::default(), ModeOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "MISSING_DATA");
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        assert_eq!(manager.state(), LifecycleState::Idle);
        let event = errors.try_recv().unwrap();
        assert_eq!(event.mode_id(), "broken");
    }

    #[tokio::test]
    async fn test_disabled_and_unmet_dependency() {
        let (manager, _) = manager();
        manager.registry().set_enabled("beta", false).unwrap();
        let err = manager
            .start("beta", ModeData::default(), ModeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Disabled(_)));

        manager.registry().register_fn(
            ModeDescriptor::new("listening", "Listening").with_dependency("speech-synthesis"),
            |_ctx| Err(AppError::Internal("factory must not run".into())),
        );
        let err = manager
            .start("listening", ModeData::default(), ModeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AppError::DependencyUnmet {
                mode_id: "listening".into(),
                dependency: "speech-synthesis".into()
            }
        );
    }

    #[tokio::test]
    async fn test_predicate_capability() {
        let (manager, _) = manager();
        let flag = Arc::new(AtomicUsize::new(0));
        let mic = flag.clone();
        manager.provide_check("microphone", move || mic.load(Ordering::SeqCst) > 0);
        manager.registry().register_fn(
            ModeDescriptor::new("speaking", "Speaking").with_dependency("microphone"),
            |ctx| {
                Ok(Box::new(ScriptedMode {
                    id: ctx.mode_id.clone(),
                    fail_init: false,
                    fail_cleanup: false,
                    position: 0,
                    renders: Arc::new(AtomicUsize::new(0)),
                }))
            },
        );

        assert!(
            manager
                .start("speaking", ModeData::default(), ModeOptions::default())
                .await
                .is_err()
        );
        flag.store(1, Ordering::SeqCst);
        assert!(
            manager
                .start("speaking", ModeData::default(), ModeOptions::default())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_wedged_cleanup_does_not_block_next_start() {
        let (manager, _) = manager();
        manager
            .start("wedged", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        manager
            .start("alpha", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();

        assert_eq!(manager.active_mode_id().await.as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let (manager, _) = manager();
        assert!(!manager.stop().await);
        assert_eq!(manager.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_session_reference_is_expanded() {
        let (manager, _) = manager();
        let mut started = manager.events().subscribe_to(&["mode:started"]);

        manager
            .start("alpha", ModeData::for_session("animals:3"), ModeOptions::default())
            .await
            .unwrap();

        let Some(ModeEvent::ModeStarted { data, .. }) = started.try_recv() else {
            panic!("expected modeStarted");
        };
        assert_eq!(data.words.len(), 3);
        let session = data.session.unwrap();
        assert_eq!(session.number, 3);
        assert_eq!(session.total_sessions, 3);
        assert_eq!(data.category_id.as_deref(), Some("animals"));
    }

    #[tokio::test]
    async fn test_category_reference_is_expanded() {
        let (manager, _) = manager();
        let mut started = manager.events().subscribe_to(&["mode:started"]);

        manager
            .start("alpha", ModeData::for_category("animals"), ModeOptions::default())
            .await
            .unwrap();

        let Some(ModeEvent::ModeStarted { data, .. }) = started.try_recv() else {
            panic!("expected modeStarted");
        };
        assert_eq!(data.words.len(), 23);
        assert!(data.session.is_none());

        let err = manager
            .start("alpha", ModeData::for_session("animals:9"), ModeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(manager.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_switch_carries_state_back_and_forth() {
        let (manager, _) = manager();
        manager
            .start("alpha", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        for _ in 0..3 {
            manager.interact(ModeAction::Next).await.unwrap();
        }

        let mut started = manager.events().subscribe_to(&["mode:started"]);
        manager
            .switch("beta", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        let Some(ModeEvent::ModeStarted { options, .. }) = started.try_recv() else {
            panic!("expected modeStarted");
        };
        let previous = options.previous_state.unwrap();
        assert_eq!(previous.mode_id, "alpha");
        assert_eq!(previous.state["position"], 3);

        manager
            .switch("alpha", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        manager.interact(ModeAction::Next).await.unwrap();
        manager
            .switch("beta", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        let Some(ModeEvent::ModeStarted { options, .. }) = started.drain().pop() else {
            panic!("expected modeStarted");
        };
        // alpha resumed at 3 and advanced once more
        assert_eq!(options.previous_state.unwrap().state["position"], 4);
    }

    #[tokio::test]
    async fn test_plain_start_discards_switch_state() {
        let (manager, _) = manager();
        manager
            .start("alpha", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        for _ in 0..3 {
            manager.interact(ModeAction::Next).await.unwrap();
        }
        manager
            .switch("beta", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        assert!(manager.stop().await);

        manager
            .start("alpha", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        let mut started = manager.events().subscribe_to(&["mode:started"]);
        manager
            .switch("beta", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        let Some(ModeEvent::ModeStarted { options, .. }) = started.try_recv() else {
            panic!("expected modeStarted");
        };
        assert_eq!(options.previous_state.unwrap().state["position"], 0);
    }

    #[tokio::test]
    async fn test_switch_state_stays_with_its_session() {
        let (manager, _) = manager();
        manager
            .start("alpha", ModeData::for_session("animals:1"), ModeOptions::default())
            .await
            .unwrap();
        for _ in 0..2 {
            manager.interact(ModeAction::Next).await.unwrap();
        }
        manager
            .switch("beta", ModeData::for_session("animals:1"), ModeOptions::default())
            .await
            .unwrap();

        let mut started = manager.events().subscribe_to(&["mode:started"]);
        // back to alpha, but on another session
        manager
            .switch("alpha", ModeData::for_session("animals:2"), ModeOptions::default())
            .await
            .unwrap();
        manager
            .switch("beta", ModeData::for_session("animals:2"), ModeOptions::default())
            .await
            .unwrap();
        let Some(ModeEvent::ModeStarted { options, .. }) = started.drain().pop() else {
            panic!("expected modeStarted");
        };
        let previous = options.previous_state.unwrap();
        assert_eq!(previous.mode_id, "alpha");
        assert_eq!(previous.state["position"], 0);
    }

    #[tokio::test]
    async fn test_metrics_recorded_on_stop_only() {
        let (manager, _) = manager();
        for _ in 0..3 {
            let _ = manager
                .start("broken", ModeData::default(), ModeOptions::default())
                .await;
        }
        assert_eq!(manager.metrics().get("broken").await.sessions_run, 0);

        manager
            .start("alpha", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();
        manager.interact(ModeAction::Flip).await.unwrap();
        manager.interact(ModeAction::Next).await.unwrap();
        manager.stop().await;

        let metrics = manager.metrics().get("alpha").await;
        assert_eq!(metrics.sessions_run, 1);
        assert_eq!(metrics.interactions, 2);
        assert!(metrics.last_used.is_some());
    }

    #[tokio::test]
    async fn test_interact_without_active_mode() {
        let (manager, _) = manager();
        let err = manager.interact(ModeAction::Next).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unregister_active_mode_stops_it() {
        let (manager, _) = manager();
        let mut events = manager.subscribe();
        manager
            .start("alpha", ModeData::default(), ModeOptions::default())
            .await
            .unwrap();

        let removed = manager.unregister("alpha").await;

        assert!(removed.is_some());
        assert!(!manager.is_active().await);
        let topics: Vec<&str> = events.drain().iter().map(|e| e.topic()).collect();
        assert_eq!(topics, vec!["mode:started", "mode:stopped", "mode:unregistered"]);
    }

    #[tokio::test]
    async fn test_concurrent_starts_keep_single_active() {
        let (manager, _) = manager();
        let mut handles = Vec::new();
        for i in 0..8 {
            let manager = manager.clone();
            let mode = if i % 2 == 0 { "alpha" } else { "beta" };
            handles.push(tokio::spawn(async move {
                manager
                    .start(mode, ModeData::default(), ModeOptions::default())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(manager.is_active().await);
        let metrics_alpha = manager.metrics().get("alpha").await.sessions_run;
        let metrics_beta = manager.metrics().get("beta").await.sessions_run;
        // seven of the eight starts were stopped by the next one
        assert_eq!(metrics_alpha + metrics_beta, 7);
    }
}

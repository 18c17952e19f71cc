//! Learning Mode contract
//!
//! Every concrete mode (flashcard, quiz, review, ...) implements
//! [`LearningModeUnit`] to take part in the lifecycle:
//! - `init` validates input and prepares working state
//! - `render` draws the current view and may be called repeatedly
//! - `cleanup` releases what the mode itself acquired, even after a failed `init`
//!
//! A mode that runs out of items announces it with `sessionEnded`; the
//! manager never polls modes for progress.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};

use crate::error::{AppError, Result};
use crate::models::mode::{ModeAction, ModeData, ModeOptions, ModeOutcome, ModeUsage};
use crate::models::review::Difficulty;
use crate::modes::events::{EventBus, ModeEvent};
use crate::modes::manager::ModeLifecycleManager;
use crate::modes::surface::Surface;
use crate::services::clock::Clock;
use crate::services::progress::SessionProgressStore;
use crate::services::scheduler::ReviewScheduler;

#[async_trait]
pub trait LearningModeUnit: Send + Sync {
    fn mode_id(&self) -> &str;

    async fn init(&mut self) -> Result<()>;

    async fn render(&mut self) -> Result<()>;

    async fn cleanup(&mut self) -> Result<()>;

    /// React to a user interaction
    async fn handle(&mut self, _action: ModeAction) -> Result<ModeOutcome> {
        Ok(ModeOutcome::Ignored)
    }

    /// Position to carry across a switch; `None` when the mode has nothing to keep
    fn save_state(&self) -> Option<Value> {
        None
    }

    fn restore_state(&mut self, _state: &Value) -> Result<()> {
        Ok(())
    }

    fn usage(&self) -> ModeUsage {
        ModeUsage::default()
    }
}

/// Builds a mode instance from its context
pub type ModeFactory = Arc<dyn Fn(ModeContext) -> Result<Box<dyn LearningModeUnit>> + Send + Sync>;

/// Everything a mode instance is handed at creation
#[derive(Clone)]
pub struct ModeContext {
    pub mode_id: String,
    pub instance_id: String,
    /// Normalized input (session/category already expanded)
    pub data: ModeData,
    pub options: ModeOptions,
    pub events: EventBus,
    pub manager: Weak<ModeLifecycleManager>,
    pub scheduler: Option<Arc<ReviewScheduler>>,
    pub progress: Option<Arc<SessionProgressStore>>,
    pub clock: Arc<dyn Clock>,
    pub surface: Arc<dyn Surface>,
}

impl std::fmt::Debug for ModeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeContext")
            .field("mode_id", &self.mode_id)
            .field("instance_id", &self.instance_id)
            .field("data", &self.data)
            .field("options", &self.options)
            .field("scheduler", &self.scheduler.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ModeContext {
    pub fn manager(&self) -> Option<Arc<ModeLifecycleManager>> {
        self.manager.upgrade()
    }

    /// Ask the manager to switch to another mode once the current call settles.
    ///
    /// Lifecycle calls are serialized, so a mode cannot switch synchronously
    /// from inside `init`/`handle`; the switch runs on a spawned task.
    pub fn request_switch(&self, mode_id: &str, data: ModeData) {
        let Some(manager) = self.manager() else {
            tracing::warn!("Switch to {} requested after manager was dropped", mode_id);
            return;
        };
        let mode_id = mode_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = manager.switch(&mode_id, data, ModeOptions::default()).await {
                tracing::warn!("Requested switch to {} failed: {}", mode_id, e);
            }
        });
    }
}

/// Shared state and helpers concrete modes embed
pub struct ModeBase {
    pub ctx: ModeContext,
    pub initialized: bool,
    pub active: bool,
    /// Free-form per-instance state
    pub state: Map<String, Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub usage: ModeUsage,
}

impl ModeBase {
    pub fn new(ctx: ModeContext) -> Self {
        Self {
            ctx,
            initialized: false,
            active: false,
            state: Map::new(),
            started_at: None,
            usage: ModeUsage::default(),
        }
    }

    pub fn mode_id(&self) -> &str {
        &self.ctx.mode_id
    }

    pub fn data(&self) -> &ModeData {
        &self.ctx.data
    }

    /// Fail with `MissingData` naming every check that did not hold
    pub fn require(&self, checks: &[(&str, bool)]) -> Result<()> {
        let missing: Vec<String> = checks
            .iter()
            .filter(|(_, present)| !present)
            .map(|(field, _)| field.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingData {
                mode_id: self.ctx.mode_id.clone(),
                fields: missing,
            })
        }
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        self.active = true;
        self.started_at = Some(self.ctx.clock.now());
    }

    pub fn present(&self, view: Value) {
        self.ctx.surface.present(&self.ctx.mode_id, &view);
    }

    pub fn record_interaction(&mut self) {
        self.usage.interactions += 1;
    }

    pub fn saw_items(&mut self, count: usize) {
        self.usage.items_seen = self.usage.items_seen.max(count as u64);
    }

    /// Forward a rating to the scheduler, when one is attached
    pub async fn rate(&mut self, item_id: &str, difficulty: Difficulty) -> Result<()> {
        self.usage.ratings += 1;
        match &self.ctx.scheduler {
            Some(scheduler) => {
                scheduler.rate(item_id, difficulty).await?;
            }
            None => tracing::debug!(
                "{} rated {} without a scheduler attached",
                self.ctx.mode_id,
                item_id
            ),
        }
        Ok(())
    }

    /// Signal the natural end of the run.
    ///
    /// Session-backed runs are marked completed before `sessionEnded` goes out.
    pub async fn finish(&mut self, state: Value, item_ids: &[String]) -> Result<()> {
        if let (Some(session), Some(progress)) = (&self.ctx.data.session, &self.ctx.progress) {
            progress.mark_completed(&session.session_id, item_ids).await?;
        }
        self.end(state);
        Ok(())
    }

    /// Emit `sessionEnded` without touching session progress
    pub fn end(&mut self, state: Value) {
        self.active = false;

        self.ctx.events.publish(ModeEvent::SessionEnded {
            mode: self.ctx.mode_id.clone(),
            state,
            metrics: self.usage,
        });
        tracing::info!("{} finished its session", self.ctx.mode_id);
    }

    /// Safe to call whether or not `init` completed
    pub fn cleanup(&mut self) {
        self.ctx.surface.clear(&self.ctx.mode_id);
        self.active = false;
        self.state.clear();
    }
}

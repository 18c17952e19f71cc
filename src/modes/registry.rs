//! Mode Registry
//!
//! Catalog of mode kinds. Registering an id that already exists replaces the
//! whole entry. Removal goes through [`ModeLifecycleManager::unregister`] so an
//! active mode is stopped before its entry disappears.
//!
//! [`ModeLifecycleManager::unregister`]: crate::modes::manager::ModeLifecycleManager::unregister

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::mode::ModeDescriptor;
use crate::modes::events::{EventBus, ModeEvent};
use crate::modes::unit::{LearningModeUnit, ModeContext, ModeFactory};

#[derive(Clone)]
struct RegisteredMode {
    descriptor: ModeDescriptor,
    factory: ModeFactory,
}

pub struct ModeRegistry {
    modes: RwLock<HashMap<String, RegisteredMode>>,
    events: EventBus,
}

impl ModeRegistry {
    pub fn new(events: EventBus) -> Self {
        Self {
            modes: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Register a mode kind; returns the descriptor it replaced, if any
    pub fn register(
        &self,
        descriptor: ModeDescriptor,
        factory: ModeFactory,
    ) -> Option<ModeDescriptor> {
        let mode_id = descriptor.id.clone();
        let replaced = self
            .modes
            .write()
            .insert(mode_id.clone(), RegisteredMode { descriptor, factory })
            .map(|previous| previous.descriptor);

        if replaced.is_some() {
            tracing::info!("Mode {} re-registered", mode_id);
        } else {
            tracing::info!("Mode {} registered", mode_id);
        }
        self.events.publish(ModeEvent::ModeRegistered { mode_id });
        replaced
    }

    /// Register with a plain closure as the factory
    pub fn register_fn<F>(&self, descriptor: ModeDescriptor, factory: F) -> Option<ModeDescriptor>
    where
        F: Fn(ModeContext) -> Result<Box<dyn LearningModeUnit>> + Send + Sync + 'static,
    {
        self.register(descriptor, Arc::new(factory))
    }

    pub(crate) fn remove(&self, mode_id: &str) -> Option<ModeDescriptor> {
        let removed = self
            .modes
            .write()
            .remove(mode_id)
            .map(|entry| entry.descriptor);
        if removed.is_some() {
            tracing::info!("Mode {} unregistered", mode_id);
            self.events.publish(ModeEvent::ModeUnregistered {
                mode_id: mode_id.to_string(),
            });
        }
        removed
    }

    /// Enabled modes, sorted by id
    pub fn list(&self) -> Vec<ModeDescriptor> {
        let mut enabled: Vec<ModeDescriptor> = self
            .modes
            .read()
            .values()
            .filter(|entry| entry.descriptor.enabled)
            .map(|entry| entry.descriptor.clone())
            .collect();
        enabled.sort_by(|a, b| a.id.cmp(&b.id));
        enabled
    }

    pub fn get(&self, mode_id: &str) -> Option<ModeDescriptor> {
        self.modes
            .read()
            .get(mode_id)
            .map(|entry| entry.descriptor.clone())
    }

    pub fn contains(&self, mode_id: &str) -> bool {
        self.modes.read().contains_key(mode_id)
    }

    pub fn len(&self) -> usize {
        self.modes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.read().is_empty()
    }

    pub(crate) fn resolve(&self, mode_id: &str) -> Result<(ModeDescriptor, ModeFactory)> {
        self.modes
            .read()
            .get(mode_id)
            .map(|entry| (entry.descriptor.clone(), entry.factory.clone()))
            .ok_or_else(|| AppError::NotFound(format!("Mode not found: {}", mode_id)))
    }

    /// Enable or disable a mode by re-registering a full replacement descriptor
    pub fn set_enabled(&self, mode_id: &str, enabled: bool) -> Result<()> {
        let (mut descriptor, factory) = self.resolve(mode_id)?;
        descriptor.enabled = enabled;
        self.register(descriptor, factory);
        Ok(())
    }
}

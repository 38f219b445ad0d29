//! Owner of the running engine
//!
//! The composition root holds one [`EngineRegistry`] and reaches the
//! engine through it. Tests build their own registry or engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::engine::{EngineDeps, EngineOptions, SyncEngine};

/// Holds at most one engine instance
#[derive(Default)]
pub struct EngineRegistry {
    current: Mutex<Option<Arc<SyncEngine>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<SyncEngine>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds a new engine, stopping and replacing any previous one
    pub fn initialize(&self, deps: EngineDeps, options: EngineOptions) -> Arc<SyncEngine> {
        let engine = Arc::new(SyncEngine::new(deps, options));
        let previous = self.slot().replace(Arc::clone(&engine));
        if let Some(previous) = previous {
            info!("Replacing running sync engine");
            previous.stop();
        }
        engine
    }

    pub fn get_instance(&self) -> Option<Arc<SyncEngine>> {
        self.slot().clone()
    }

    /// Stops and releases the current engine
    pub fn stop(&self) {
        let current = self.slot().take();
        if let Some(engine) = current {
            engine.stop();
        }
    }
}

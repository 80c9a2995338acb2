//! Storage-backed roadmap service.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};
use upnext_core::{Error, Result, Roadmap, RoadmapEvent, TaskId, UserId};
use upnext_storage::{Storage, UserLocks};

use crate::catalog::{Catalog, CatalogKey};
use crate::engine;

/// Runs roadmap operations against storage, one learner at a time.
pub struct RoadmapService {
    storage: Arc<dyn Storage>,
    catalog: Arc<Catalog>,
    locks: UserLocks,
    events: Option<mpsc::UnboundedSender<RoadmapEvent>>,
}

impl RoadmapService {
    /// Create a service.
    pub fn new(storage: Arc<dyn Storage>, catalog: Arc<Catalog>, locks: UserLocks) -> Self {
        Self {
            storage,
            catalog,
            locks,
            events: None,
        }
    }

    /// Publish completion events on `sender`.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<RoadmapEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Generate a fresh roadmap, replacing any existing one.
    ///
    /// `fallback` is used when `(role, level)` has no catalog entry.
    pub async fn start(
        &self,
        user: &UserId,
        role: &str,
        level: &str,
        fallback: Option<&CatalogKey>,
    ) -> Result<Roadmap> {
        let key = CatalogKey::new(role, level);
        let (used, _) = self.catalog.resolve(&key, fallback)?;
        if used != &key {
            info!(user_id = %user, role, level, fallback_role = %used.role, "Using fallback catalog entry");
        }

        let _guard = self.locks.lock(user).await;
        let mut roadmap =
            engine::generate_initial_roadmap(&self.catalog, user.clone(), &used.role, &used.level)?;

        if let Some(existing) = self.storage.load_roadmap(user).await? {
            roadmap.version = existing.version;
        }
        roadmap.version = self.storage.save_roadmap(&roadmap).await?;

        info!(user_id = %user, tasks = roadmap.tasks.len(), "Generated roadmap");
        Ok(roadmap)
    }

    /// Complete a task and persist the adapted roadmap.
    pub async fn complete_task(
        &self,
        user: &UserId,
        task_id: TaskId,
        mastery_score: u8,
        notes: Option<String>,
    ) -> Result<Roadmap> {
        let _guard = self.locks.lock(user).await;

        let current = self
            .storage
            .load_roadmap(user)
            .await?
            .ok_or_else(|| Error::not_found("roadmap", user))?;

        let engine::Completion {
            mut roadmap,
            event,
            inserted,
        } = engine::complete_task(&current, task_id, mastery_score, notes, chrono::Utc::now())?;

        roadmap.version = self.storage.save_roadmap(&roadmap).await?;

        info!(
            user_id = %user,
            task_id = %task_id,
            mastery_score,
            inserted = inserted.len(),
            completion = roadmap.completion_percentage,
            "Task completed"
        );

        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                debug!("No listener for roadmap events");
            }
        }

        Ok(roadmap)
    }

    /// Load a learner's roadmap.
    pub async fn roadmap(&self, user: &UserId) -> Result<Roadmap> {
        self.storage
            .load_roadmap(user)
            .await?
            .ok_or_else(|| Error::not_found("roadmap", user))
    }
}

//! JSON file storage implementation.
//!
//! Stores data as JSON files under a root directory and keeps small
//! per-object meta markers (version + updated_at). Version checks and file
//! writes happen under a single write lock, so a save either fully lands
//! with a bumped version or fails with a conflict.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use upnext_core::{Notification, NotificationId, Roadmap, Timeline, UserId, UserProfile};

use super::trait_::{next_version, NotificationFilter, NotificationUpdate};
use super::{Result, Storage, StorageError};

const USERS: &str = "users";
const ROADMAPS: &str = "roadmaps";
const TIMELINES: &str = "timelines";
const NOTIFICATIONS: &str = "notifications";

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStorage {
    /// Create storage, creating the data and meta directories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        for kind in [USERS, ROADMAPS, TIMELINES, NOTIFICATIONS] {
            fs::create_dir_all(root.join(kind)).await?;
        }
        // Version markers for the optimistically locked aggregates
        fs::create_dir_all(root.join("meta").join(ROADMAPS)).await?;
        fs::create_dir_all(root.join("meta").join(TIMELINES)).await?;

        debug!(root = %root.display(), "Opened JSON storage");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, kind: &str, id: &str) -> PathBuf {
        self.root.join(kind).join(format!("{}.json", file_stem(id)))
    }

    fn meta_path(&self, kind: &str, id: &str) -> PathBuf {
        self.root
            .join("meta")
            .join(kind)
            .join(format!("{}.meta.json", file_stem(id)))
    }

    async fn stored_version(&self, kind: &str, id: &str) -> Result<u64> {
        let meta: Option<serde_json::Value> = read_json(&self.meta_path(kind, id)).await?;
        Ok(meta
            .and_then(|m| m.get("version").and_then(|v| v.as_u64()))
            .unwrap_or(0))
    }

    async fn write_version(&self, kind: &str, id: &str, version: u64) -> Result<()> {
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        write_json(&self.meta_path(kind, id), &meta).await
    }

    /// Version-checked save of a per-user aggregate. Caller holds the write lock.
    async fn save_versioned<T: serde::Serialize>(
        &self,
        kind: &str,
        user: &UserId,
        expected: u64,
        value: &mut T,
        set_version: impl FnOnce(&mut T, u64),
    ) -> Result<u64> {
        let stored = self.stored_version(kind, user.as_str()).await?;
        let version = next_version(&format!("{kind}:{user}"), stored, expected)?;

        set_version(value, version);
        write_json(&self.path(kind, user.as_str()), value).await?;
        self.write_version(kind, user.as_str(), version).await?;
        Ok(version)
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn save_user(&self, profile: &UserProfile) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.path(USERS, profile.user_id.as_str()), profile).await
    }

    async fn load_user(&self, id: &UserId) -> Result<Option<UserProfile>> {
        read_json(&self.path(USERS, id.as_str())).await
    }

    async fn load_roadmap(&self, user: &UserId) -> Result<Option<Roadmap>> {
        read_json(&self.path(ROADMAPS, user.as_str())).await
    }

    async fn save_roadmap(&self, roadmap: &Roadmap) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let mut saved = roadmap.clone();
        let version = self
            .save_versioned(ROADMAPS, &roadmap.user_id, roadmap.version, &mut saved, |r, v| {
                r.version = v
            })
            .await?;
        debug!(user = %roadmap.user_id, version, "Saved roadmap");
        Ok(version)
    }

    async fn load_timeline(&self, user: &UserId) -> Result<Option<Timeline>> {
        read_json(&self.path(TIMELINES, user.as_str())).await
    }

    async fn save_timeline(&self, timeline: &Timeline) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let mut saved = timeline.clone();
        let version = self
            .save_versioned(TIMELINES, &timeline.user_id, timeline.version, &mut saved, |t, v| {
                t.version = v
            })
            .await?;
        debug!(user = %timeline.user_id, version, "Saved timeline");
        Ok(version)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json(
            &self.path(NOTIFICATIONS, &notification.id.to_string()),
            notification,
        )
        .await
    }

    async fn load_notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        read_json(&self.path(NOTIFICATIONS, &id.to_string())).await
    }

    async fn list_notifications(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let all: Vec<Notification> = list_dir(&self.root.join(NOTIFICATIONS)).await?;
        let items = all.into_iter().filter(|n| filter.matches(n)).collect();
        Ok(filter.finish(items))
    }

    async fn update_notification(
        &self,
        id: NotificationId,
        update: NotificationUpdate,
    ) -> Result<Notification> {
        let _guard = self.write_lock.lock().await;
        let path = self.path(NOTIFICATIONS, &id.to_string());
        let mut notification: Notification = read_json(&path)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("notification {id}")))?;
        update.apply(&mut notification);
        write_json(&path, &notification).await?;
        Ok(notification)
    }
}

/// Map an id onto a safe, unique file name.
///
/// ASCII alphanumerics and `-` are kept; every other byte becomes `_xx`
/// (lowercase hex), so distinct ids never share a file.
fn file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{byte:02x}"));
        }
    }
    stem
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write through a temp file and rename so readers never see a torn file.
async fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

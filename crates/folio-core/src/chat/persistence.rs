//! Conversation persistence: a single versioned record, written through a
//! debounced scheduler so fast message bursts coalesce into one write.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chat::state::{ConversationContext, Message};
use crate::error::{AssistantError, Result};

/// Schema version tag. A record with any other tag is discarded in full.
pub const STORAGE_VERSION: &str = "1.0";

/// Quiet interval before a scheduled save is written.
const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(1000);

/// The on-disk conversation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedConversation {
    pub version: String,
    pub messages: Vec<Message>,
    pub context: ConversationContext,
    pub saved_at_ms: i64,
}

impl PersistedConversation {
    pub fn new(messages: Vec<Message>, context: ConversationContext) -> Self {
        Self {
            version: STORAGE_VERSION.to_string(),
            messages,
            context,
            saved_at_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_current_version(&self) -> bool {
        self.version == STORAGE_VERSION
    }

    pub fn is_expired(&self, max_age: Duration) -> bool {
        let age_ms = Utc::now().timestamp_millis() - self.saved_at_ms;
        age_ms < 0 || age_ms as u128 > max_age.as_millis()
    }
}

/// Storage seam for the persisted record. The browser original kept one
/// keyed local-storage entry; implementations here keep one record too.
pub trait ConversationStorage: Send + Sync {
    fn load(&self) -> Result<Option<PersistedConversation>>;
    fn store(&self, record: &PersistedConversation) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Single-file JSON storage with tmp-file-and-rename writes. An unreadable
/// or unparsable record is treated as a cache miss and removed.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new() -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| AssistantError::Config("Could not determine data directory".into()))?
            .join("folio");
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join("conversation.json"),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ConversationStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedConversation>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable conversation record");
                let _ = fs::remove_file(&self.path);
                return Ok(None);
            }
        };

        match serde_json::from_str(&contents) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt conversation record discarded");
                let _ = fs::remove_file(&self.path);
                Ok(None)
            }
        }
    }

    fn store(&self, record: &PersistedConversation) -> Result<()> {
        let contents = serde_json::to_string_pretty(record)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory storage for tests and embedding.
#[derive(Default)]
pub struct MemoryStorage {
    record: Mutex<Option<PersistedConversation>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedConversation>> {
        Ok(self.record.lock().unwrap().clone())
    }

    fn store(&self, record: &PersistedConversation) -> Result<()> {
        *self.record.lock().unwrap() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.record.lock().unwrap().take();
        Ok(())
    }
}

/// Debounced save scheduler. Each `schedule` replaces the pending snapshot
/// (last-write-wins) and restarts the quiet-interval timer; the write lands
/// once the timer fires, or immediately on `flush`.
pub struct SaveScheduler {
    storage: Arc<dyn ConversationStorage>,
    quiet_interval: Duration,
    pending: Arc<Mutex<Option<PersistedConversation>>>,
    timer: Option<tokio::task::JoinHandle<()>>,
}

impl SaveScheduler {
    pub fn new(storage: Arc<dyn ConversationStorage>) -> Self {
        Self {
            storage,
            quiet_interval: DEFAULT_QUIET_INTERVAL,
            pending: Arc::new(Mutex::new(None)),
            timer: None,
        }
    }

    pub fn with_quiet_interval(mut self, interval: Duration) -> Self {
        self.quiet_interval = interval;
        self
    }

    pub fn storage(&self) -> &Arc<dyn ConversationStorage> {
        &self.storage
    }

    pub fn schedule(&mut self, record: PersistedConversation) {
        *self.pending.lock().unwrap() = Some(record);

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let pending = self.pending.clone();
        let storage = self.storage.clone();
        let quiet = self.quiet_interval;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let record = pending.lock().unwrap().take();
            if let Some(record) = record {
                if let Err(e) = storage.store(&record) {
                    warn!(error = %e, "debounced conversation save failed");
                }
            }
        }));
    }

    /// Write any pending snapshot now, cancelling the timer.
    pub fn flush(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let record = self.pending.lock().unwrap().take();
        if let Some(record) = record {
            if let Err(e) = self.storage.store(&record) {
                warn!(error = %e, "conversation save failed");
            }
        }
    }

    /// Drop the pending snapshot without writing it.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.pending.lock().unwrap().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record_with_version(version: &str) -> PersistedConversation {
        PersistedConversation {
            version: version.to_string(),
            messages: Vec::new(),
            context: ConversationContext::default(),
            saved_at_ms: Utc::now().timestamp_millis(),
        }
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::with_path(dir.path().join("conversation.json"));

        assert!(storage.load().unwrap().is_none());

        let record = record_with_version(STORAGE_VERSION);
        storage.store(&record).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert!(loaded.is_current_version());
        assert_eq!(loaded.saved_at_ms, record.saved_at_ms);

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_record_is_a_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        fs::write(&path, "{ not valid json").unwrap();

        let storage = FileStorage::with_path(path.clone());
        assert!(storage.load().unwrap().is_none());
        // The corrupt record is removed outright, never partially migrated.
        assert!(!path.exists());
    }

    #[test]
    fn expiry_window() {
        let mut record = record_with_version(STORAGE_VERSION);
        assert!(!record.is_expired(Duration::from_secs(24 * 60 * 60)));

        record.saved_at_ms -= 25 * 60 * 60 * 1000;
        assert!(record.is_expired(Duration::from_secs(24 * 60 * 60)));
    }

    struct CountingStorage {
        inner: MemoryStorage,
        writes: AtomicUsize,
    }

    impl CountingStorage {
        fn new() -> Self {
            Self {
                inner: MemoryStorage::new(),
                writes: AtomicUsize::new(0),
            }
        }
    }

    impl ConversationStorage for CountingStorage {
        fn load(&self) -> Result<Option<PersistedConversation>> {
            self.inner.load()
        }
        fn store(&self, record: &PersistedConversation) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.store(record)
        }
        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_schedules_coalesce_into_one_write() {
        let storage = Arc::new(CountingStorage::new());
        let mut scheduler = SaveScheduler::new(storage.clone());

        let mut record = record_with_version(STORAGE_VERSION);
        scheduler.schedule(record.clone());
        record.saved_at_ms += 1;
        scheduler.schedule(record.clone());
        record.saved_at_ms += 1;
        scheduler.schedule(record.clone());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        tokio::task::yield_now().await;

        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
        let stored = storage.load().unwrap().unwrap();
        assert_eq!(stored.saved_at_ms, record.saved_at_ms);
    }

    #[tokio::test]
    async fn flush_writes_immediately_and_cancel_drops() {
        let storage = Arc::new(CountingStorage::new());
        let mut scheduler = SaveScheduler::new(storage.clone());

        scheduler.schedule(record_with_version(STORAGE_VERSION));
        scheduler.flush();
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);

        scheduler.schedule(record_with_version(STORAGE_VERSION));
        scheduler.cancel();
        scheduler.flush();
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
    }
}

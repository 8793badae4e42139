//! Dedup journals
//!
//! The message cache remembers every message identity ever observed; the
//! OTP history remembers, per number, which codes were recorded and when, so
//! a re-tagged copy of the same SMS can be suppressed.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::storage::DocumentStore;
use crate::error::{CacheError, Result};
use crate::models::{MessageIdentity, SmsEvent};

/// Document name of the message cache
pub const MESSAGE_CACHE_DOC: &str = "sms_cache";

/// Document name of the OTP history
pub const OTP_HISTORY_DOC: &str = "otp_history";

/// Seconds in which the same code under a different identity is suppressed
pub const NEAR_DUPLICATE_WINDOW_SECS: i64 = 60;

/// Journal timestamps: RFC 3339 on write; naive ISO-8601 (read as UTC)
/// is accepted from older journals.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpEntry {
    pub otp: String,
    pub message_id: MessageIdentity,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// What `record` did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// New identity, code appended to the number's history
    Accepted,
    /// New identity, but the code was already recorded under another identity
    /// inside the window; history left untouched
    NearDuplicate,
    /// Identity was already in the message cache; nothing changed
    AlreadySeen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalStats {
    pub messages: usize,
    pub numbers: usize,
    pub otp_entries: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PruneStats {
    pub messages_removed: usize,
    pub otp_entries_removed: usize,
}

/// Message cache plus OTP history, persisted after every mutation.
pub struct DedupCache {
    store: Arc<dyn DocumentStore>,
    seen: BTreeMap<MessageIdentity, SeenEntry>,
    history: BTreeMap<String, Vec<OtpEntry>>,
}

impl DedupCache {
    /// Load both journals; a document that was never written reads as empty.
    pub async fn load(store: Arc<dyn DocumentStore>) -> Result<Self> {
        let seen = read_document(store.clone(), MESSAGE_CACHE_DOC).await?;
        let history = read_document(store.clone(), OTP_HISTORY_DOC).await?;
        Ok(Self {
            store,
            seen,
            history,
        })
    }

    /// Overwrite both journals with empty documents without reading them.
    ///
    /// Recovers a store whose journals no longer parse.
    pub async fn reset(store: Arc<dyn DocumentStore>) -> Result<PruneStats> {
        let mut cache = Self {
            store,
            seen: BTreeMap::new(),
            history: BTreeMap::new(),
        };
        cache.clear().await
    }

    /// Whether the identity has never been observed. Read-only.
    pub fn is_novel(&self, identity: &MessageIdentity) -> bool {
        !self.seen.contains_key(identity)
    }

    /// Same code for the same number under a different identity, recorded
    /// less than [`NEAR_DUPLICATE_WINDOW_SECS`] before `now`.
    pub fn is_near_duplicate(&self, event: &SmsEvent, now: DateTime<Utc>) -> bool {
        let window = Duration::seconds(NEAR_DUPLICATE_WINDOW_SECS);
        self.history.get(&event.number).is_some_and(|entries| {
            entries.iter().any(|entry| {
                entry.otp == event.otp
                    && entry.message_id != event.identity
                    && now - entry.timestamp < window
            })
        })
    }

    /// Mark the event seen and apply the near-duplicate rule to its code.
    pub async fn record(&mut self, event: &SmsEvent, now: DateTime<Utc>) -> Result<RecordOutcome> {
        if !self.is_novel(&event.identity) {
            return Ok(RecordOutcome::AlreadySeen);
        }

        let near_duplicate = self.is_near_duplicate(event, now);

        self.seen
            .insert(event.identity.clone(), SeenEntry { timestamp: now });
        self.persist_seen().await?;

        if near_duplicate {
            debug!(
                "OTP {} for {} already recorded under another message",
                event.otp, event.number
            );
            return Ok(RecordOutcome::NearDuplicate);
        }

        self.history
            .entry(event.number.clone())
            .or_default()
            .push(OtpEntry {
                otp: event.otp.clone(),
                message_id: event.identity.clone(),
                timestamp: now,
            });
        self.persist_history().await?;

        Ok(RecordOutcome::Accepted)
    }

    pub fn stats(&self) -> JournalStats {
        let timestamps = self
            .seen
            .values()
            .map(|entry| entry.timestamp)
            .chain(self.history.values().flatten().map(|entry| entry.timestamp));
        let (oldest, newest) = timestamps.fold((None, None), |(lo, hi), ts| {
            (
                Some(lo.map_or(ts, |lo: DateTime<Utc>| lo.min(ts))),
                Some(hi.map_or(ts, |hi: DateTime<Utc>| hi.max(ts))),
            )
        });

        JournalStats {
            messages: self.seen.len(),
            numbers: self.history.len(),
            otp_entries: self.history.values().map(Vec::len).sum(),
            oldest,
            newest,
        }
    }

    /// Empty both journals.
    pub async fn clear(&mut self) -> Result<PruneStats> {
        let removed = PruneStats {
            messages_removed: self.seen.len(),
            otp_entries_removed: self.history.values().map(Vec::len).sum(),
        };
        self.seen.clear();
        self.history.clear();
        self.persist_seen().await?;
        self.persist_history().await?;
        Ok(removed)
    }

    /// Drop entries recorded before `cutoff`.
    pub async fn prune(&mut self, cutoff: DateTime<Utc>) -> Result<PruneStats> {
        let before_seen = self.seen.len();
        self.seen.retain(|_, entry| entry.timestamp >= cutoff);

        let mut otp_entries_removed = 0;
        self.history.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.timestamp >= cutoff);
            otp_entries_removed += before - entries.len();
            !entries.is_empty()
        });

        let stats = PruneStats {
            messages_removed: before_seen - self.seen.len(),
            otp_entries_removed,
        };
        if stats.messages_removed > 0 {
            self.persist_seen().await?;
        }
        if stats.otp_entries_removed > 0 {
            self.persist_history().await?;
        }
        Ok(stats)
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    async fn persist_seen(&self) -> Result<()> {
        let body = serde_json::to_string_pretty(&self.seen)?;
        write_document(self.store.clone(), MESSAGE_CACHE_DOC, body).await
    }

    async fn persist_history(&self) -> Result<()> {
        let body = serde_json::to_string_pretty(&self.history)?;
        write_document(self.store.clone(), OTP_HISTORY_DOC, body).await
    }
}

async fn read_document<T>(store: Arc<dyn DocumentStore>, name: &'static str) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let body = tokio::task::spawn_blocking(move || store.read(name))
        .await
        .map_err(|e| CacheError::Io(e.to_string()))??;

    match body {
        Some(body) if !body.trim().is_empty() => {
            serde_json::from_str(&body).map_err(|e| {
                CacheError::Corrupt {
                    name: name.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
        }
        _ => Ok(T::default()),
    }
}

async fn write_document(
    store: Arc<dyn DocumentStore>,
    name: &'static str,
    body: String,
) -> Result<()> {
    tokio::task::spawn_blocking(move || store.write(name, &body))
        .await
        .map_err(|e| CacheError::Io(e.to_string()))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::storage::{JsonFileStore, SqliteStore};
    use crate::models::RawMessage;
    use tempfile::TempDir;

    fn event(number: &str, message: &str) -> SmsEvent {
        SmsEvent::derive(&RawMessage {
            number: number.to_string(),
            range: "Brazil Main".to_string(),
            message: message.to_string(),
            service: "WhatsApp".to_string(),
        })
    }

    async fn sqlite_cache(dir: &TempDir) -> DedupCache {
        let store = Arc::new(SqliteStore::open_at(dir.path()).unwrap());
        DedupCache::load(store).await.unwrap()
    }

    #[tokio::test]
    async fn test_record_makes_event_known() {
        let dir = TempDir::new().unwrap();
        let mut cache = sqlite_cache(&dir).await;
        let e = event("+1", "Your code is 1234");
        let now = Utc::now();

        assert!(cache.is_novel(&e.identity));
        assert_eq!(cache.record(&e, now).await.unwrap(), RecordOutcome::Accepted);
        assert!(!cache.is_novel(&e.identity));
    }

    #[tokio::test]
    async fn test_record_twice_keeps_one_entry() {
        let dir = TempDir::new().unwrap();
        let mut cache = sqlite_cache(&dir).await;
        let e = event("+1", "Your code is 1234");
        let now = Utc::now();

        cache.record(&e, now).await.unwrap();
        assert_eq!(
            cache.record(&e, now).await.unwrap(),
            RecordOutcome::AlreadySeen
        );

        let stats = cache.stats();
        assert_eq!(stats.messages, 1);
        assert_eq!(stats.otp_entries, 1);
    }

    #[tokio::test]
    async fn test_near_duplicate_within_window_is_suppressed() {
        let dir = TempDir::new().unwrap();
        let mut cache = sqlite_cache(&dir).await;
        let start = Utc::now();
        let first = event("+1", "Your code is 1234");
        let retagged = event("+1", "Code 1234 - do not share");

        cache.record(&first, start).await.unwrap();

        let later = start + Duration::seconds(30);
        assert!(cache.is_near_duplicate(&retagged, later));
        assert_eq!(
            cache.record(&retagged, later).await.unwrap(),
            RecordOutcome::NearDuplicate
        );
        // still marked seen so it is never re-examined
        assert!(!cache.is_novel(&retagged.identity));
        assert_eq!(cache.stats().otp_entries, 1);
    }

    #[tokio::test]
    async fn test_same_code_after_window_is_accepted() {
        let dir = TempDir::new().unwrap();
        let mut cache = sqlite_cache(&dir).await;
        let start = Utc::now();

        cache
            .record(&event("+1", "Your code is 1234"), start)
            .await
            .unwrap();

        let later = start + Duration::seconds(61);
        let again = event("+1", "New login, code 1234");
        assert!(!cache.is_near_duplicate(&again, later));
        assert_eq!(
            cache.record(&again, later).await.unwrap(),
            RecordOutcome::Accepted
        );
        assert_eq!(cache.stats().otp_entries, 2);
    }

    #[tokio::test]
    async fn test_near_duplicate_is_per_number() {
        let dir = TempDir::new().unwrap();
        let mut cache = sqlite_cache(&dir).await;
        let now = Utc::now();

        cache
            .record(&event("+1", "Your code is 1234"), now)
            .await
            .unwrap();
        assert!(!cache.is_near_duplicate(&event("+2", "Your code is 1234"), now));
    }

    #[tokio::test]
    async fn test_journals_survive_reload() {
        let dir = TempDir::new().unwrap();
        let e = event("+1", "Your code is 1234");
        {
            let mut cache = sqlite_cache(&dir).await;
            cache.record(&e, Utc::now()).await.unwrap();
        }
        let cache = sqlite_cache(&dir).await;
        assert!(!cache.is_novel(&e.identity));
        assert_eq!(cache.stats().numbers, 1);
    }

    #[tokio::test]
    async fn test_reads_legacy_json_journals() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("sms_cache.json"),
            r#"{"+1_Your code is 1234": {"timestamp": "2024-05-01T10:15:30.123456"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("otp_history.json"),
            r#"{"+1": [{"otp": "1234", "message_id": "+1_Your code is 1234", "timestamp": "2024-05-01T10:15:30.123456"}]}"#,
        )
        .unwrap();

        let store = Arc::new(JsonFileStore::open_at(dir.path()).unwrap());
        let cache = DedupCache::load(store).await.unwrap();

        assert!(!cache.is_novel(&MessageIdentity::from("+1_Your code is 1234")));
        let stats = cache.stats();
        assert_eq!(stats.otp_entries, 1);
        assert_eq!(
            stats.oldest.map(|ts| ts.to_rfc3339()),
            Some("2024-05-01T10:15:30.123456+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn test_corrupt_journal_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sms_cache.json"), "{not json").unwrap();

        let store = Arc::new(JsonFileStore::open_at(dir.path()).unwrap());
        let err = DedupCache::load(store.clone()).await.err().unwrap();
        assert!(err.to_string().contains("sms_cache"));

        DedupCache::reset(store.clone()).await.unwrap();
        let recovered = DedupCache::load(store).await.unwrap();
        assert_eq!(recovered.stats().messages, 0);
    }

    #[tokio::test]
    async fn test_prune_drops_old_entries() {
        let dir = TempDir::new().unwrap();
        let mut cache = sqlite_cache(&dir).await;
        let now = Utc::now();

        cache
            .record(&event("+1", "Your code is 1111"), now - Duration::hours(48))
            .await
            .unwrap();
        cache
            .record(&event("+2", "Your code is 2222"), now)
            .await
            .unwrap();

        let stats = cache.prune(now - Duration::hours(24)).await.unwrap();
        assert_eq!(stats.messages_removed, 1);
        assert_eq!(stats.otp_entries_removed, 1);

        let remaining = cache.stats();
        assert_eq!(remaining.messages, 1);
        assert_eq!(remaining.numbers, 1);
    }

    #[tokio::test]
    async fn test_clear_empties_both_journals() {
        let dir = TempDir::new().unwrap();
        let mut cache = sqlite_cache(&dir).await;
        cache
            .record(&event("+1", "Your code is 1111"), Utc::now())
            .await
            .unwrap();

        let removed = cache.clear().await.unwrap();
        assert_eq!(removed.messages_removed, 1);

        let reloaded = sqlite_cache(&dir).await;
        assert_eq!(reloaded.stats().messages, 0);
        assert_eq!(reloaded.stats().otp_entries, 0);
    }
}

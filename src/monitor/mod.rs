//! The poll loop
//!
//! One [`Monitor`] owns the dashboard session, the dedup journals and the
//! dispatcher. It is the only writer of all three, so none of them need
//! shared ownership.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::cache::DedupCache;
use crate::client::fetch::fetch_details;
use crate::client::{DashboardApi, Session, SessionManager};
use crate::error::{ApiError, Error, Result};
use crate::models::{MessageIdentity, Range, RawMessage, SmsEvent};
use crate::notify::{Dispatcher, Transport};

/// Pause after every completed cycle
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Pause after a cycle that failed
pub const ERROR_BACKOFF: Duration = Duration::from_secs(10);

/// Events dispatched together before the inter-batch pause
pub const DISPATCH_BATCH_SIZE: usize = 20;

/// Pause between dispatch batches
pub const BATCH_PAUSE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Init,
    LoggedIn,
    Polling,
    /// Re-establishing an expired or rejected session
    Reauth,
    /// Last cycle failed; the next one starts after [`ERROR_BACKOFF`]
    Failed,
}

/// What one cycle saw and did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub ranges: usize,
    pub numbers: usize,
    /// Novel deliverable events found this cycle
    pub queued: usize,
    /// Events suppressed as re-tagged copies of a recorded code
    pub near_duplicates: usize,
    /// Events that reached at least one recipient
    pub delivered: usize,
}

impl CycleReport {
    fn log(&self) {
        if self.queued == 0 {
            info!("No new SMS messages found");
            return;
        }
        info!(
            "Cycle: {} ranges, {} numbers, {} new, {} near-duplicates, {} delivered",
            self.ranges, self.numbers, self.queued, self.near_duplicates, self.delivered
        );
    }
}

/// Links carried by the start-up announcement
#[derive(Debug, Clone, Default)]
pub struct Announcement {
    pub owner_id: Option<String>,
    pub updates_url: Option<String>,
}

pub struct Monitor<A: DashboardApi + ?Sized + 'static, T: Transport + ?Sized> {
    api: Arc<A>,
    sessions: SessionManager<A>,
    dispatcher: Dispatcher<T>,
    cache: DedupCache,
    announcement: Announcement,
    state: MonitorState,
    /// Completed cycles
    cycles: u64,
}

impl<A: DashboardApi + ?Sized + 'static, T: Transport + ?Sized> Monitor<A, T> {
    pub fn new(api: Arc<A>, dispatcher: Dispatcher<T>, cache: DedupCache) -> Self {
        Self {
            sessions: SessionManager::new(api.clone()),
            api,
            dispatcher,
            cache,
            announcement: Announcement::default(),
            state: MonitorState::Init,
            cycles: 0,
        }
    }

    pub fn with_announcement(mut self, announcement: Announcement) -> Self {
        self.announcement = announcement;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Announce start-up, then poll until `shutdown` resolves.
    ///
    /// A failed cycle never ends the loop; it only delays the next one.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.dispatcher
            .send_start_alert(
                self.announcement.owner_id.as_deref(),
                self.announcement.updates_url.as_deref(),
            )
            .await;

        loop {
            let outcome = tokio::select! {
                _ = &mut shutdown => break,
                outcome = self.poll_once() => outcome,
            };
            let pause = match outcome {
                Ok(report) => {
                    report.log();
                    POLL_INTERVAL
                }
                Err(err) => {
                    error!("Error in poll cycle: {}", err);
                    self.state = MonitorState::Failed;
                    ERROR_BACKOFF
                }
            };

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("Monitor stopped");
    }

    /// Run one full cycle: session, listing, details, dedup, dispatch.
    pub async fn poll_once(&mut self) -> Result<CycleReport> {
        let session = self.refresh_session().await?;
        self.state = MonitorState::Polling;

        let mut report = CycleReport::default();
        let ranges = self.list_ranges(&session).await;
        report.ranges = ranges.len();

        let mut queued = Vec::new();
        let mut queued_ids: HashSet<MessageIdentity> = HashSet::new();

        for range in &ranges {
            let numbers = self.list_numbers(&session, range).await;
            if self.session_rejected() {
                break;
            }
            report.numbers += numbers.len();

            for raw in self.fetch_messages(&session, range, numbers).await {
                let event = SmsEvent::derive(&raw);
                if !event.is_deliverable() || !self.cache.is_novel(&event.identity) {
                    continue;
                }
                if queued_ids.insert(event.identity.clone()) {
                    queued.push(event);
                }
            }
            if self.session_rejected() {
                break;
            }
        }

        report.queued = queued.len();
        if !queued.is_empty() {
            info!("Found {} new SMS messages", queued.len());
        }
        self.dispatch(&queued, &mut report).await?;
        self.cycles += 1;
        Ok(report)
    }

    async fn refresh_session(&mut self) -> Result<Session> {
        if !self.sessions.needs_login() {
            return self.sessions.ensure_logged_in().await;
        }

        let first_login = self.cycles == 0;
        if !first_login {
            self.state = MonitorState::Reauth;
        }
        let session = self.sessions.ensure_logged_in().await?;
        if first_login {
            info!("Login successful, starting monitoring");
            self.state = MonitorState::LoggedIn;
        }
        Ok(session)
    }

    async fn list_ranges(&mut self, session: &Session) -> Vec<Range> {
        match self.api.list_ranges(session).await {
            Ok(ranges) => ranges,
            Err(err) => {
                self.recover("listing ranges", &err);
                Vec::new()
            }
        }
    }

    async fn list_numbers(&mut self, session: &Session, range: &Range) -> Vec<String> {
        match self.api.list_numbers(session, range).await {
            Ok(numbers) => numbers,
            Err(err) => {
                self.recover(&format!("listing numbers of {}", range.label), &err);
                Vec::new()
            }
        }
    }

    /// Every number yields a message; failed fetches become the sentinel.
    async fn fetch_messages(
        &mut self,
        session: &Session,
        range: &Range,
        numbers: Vec<String>,
    ) -> Vec<RawMessage> {
        let results = fetch_details(self.api.clone(), session, range, numbers.clone()).await;

        numbers
            .iter()
            .zip(results)
            .map(|(number, result)| match result {
                Ok(raw) => raw,
                Err(err) => {
                    self.recover(&format!("fetching {} in {}", number, range.label), &err);
                    RawMessage::sentinel(number, &range.label)
                }
            })
            .collect()
    }

    /// The session was dropped mid-cycle; its token must not be sent again.
    fn session_rejected(&self) -> bool {
        let rejected = !self.sessions.is_logged_in();
        if rejected {
            warn!("Dashboard session rejected, ending cycle early");
        }
        rejected
    }

    /// Log a fetch failure and drop the session if it was an auth failure.
    fn recover(&mut self, context: &str, err: &Error) {
        warn!("Error {}: {}", context, err);
        if matches!(err, Error::Api(ApiError::Unauthorized)) {
            self.sessions.invalidate();
        }
    }

    async fn dispatch(&mut self, queued: &[SmsEvent], report: &mut CycleReport) -> Result<()> {
        for (index, batch) in queued.chunks(DISPATCH_BATCH_SIZE).enumerate() {
            if index > 0 {
                info!("Processed batch, waiting {}s", BATCH_PAUSE.as_secs());
                tokio::time::sleep(BATCH_PAUSE).await;
            }

            let now = Utc::now();
            let mut outgoing = Vec::new();
            let mut deferred = Vec::new();
            let mut claimed: HashSet<(&str, &str)> = HashSet::new();

            for event in batch {
                if self.cache.is_near_duplicate(event, now) {
                    self.cache.record(event, now).await?;
                    report.near_duplicates += 1;
                } else if !claimed.insert((event.number.as_str(), event.otp.as_str())) {
                    // same code twice in one batch: judged once the first is recorded
                    deferred.push(event);
                } else {
                    info!("Sending OTP for {}: {}", event.number, event.otp);
                    outgoing.push(event);
                }
            }

            let deliveries = join_all(outgoing.iter().map(|event| self.dispatcher.deliver(event))).await;
            for (event, delivery) in outgoing.iter().zip(deliveries) {
                if delivery.sent() > 0 {
                    report.delivered += 1;
                }
                self.cache.record(event, Utc::now()).await?;
            }

            for event in deferred {
                let outcome = self.cache.record(event, Utc::now()).await?;
                debug!("Deferred {} recorded as {:?}", event.identity, outcome);
                report.near_duplicates += 1;
            }
        }
        Ok(())
    }
}

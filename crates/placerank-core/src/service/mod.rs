//! The history façade.
//!
//! `HistoryService` owns the visit store, the ranked index, and the change
//! notifier. Mutations are serialized on one async lock; when a mutation
//! returns, the row count, every affected frecency, and the index already
//! reflect it, and its events are queued behind those of earlier mutations.

mod input;

pub use input::{DEFAULT_TITLE_PREFIX, VisitInput};

use crate::clock::{Clock, SystemClock, VisitTimeSequence};
use crate::config::Config;
use crate::frecency::{FrecencyEngine, PROVISIONAL_FRECENCY};
use crate::index::LinkIndex;
use crate::link_checker::{LinkChecker, split_scheme};
use crate::notify::{ChangeNotifier, Handler};
use crate::store::{UrlRecord, VisitStore, write_snapshot};
use crate::{Error, Result};
use placerank_types::{EventKind, Link, LinkEvent, Visit};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

struct HistoryState {
    store: VisitStore,
    index: LinkIndex,
    times: VisitTimeSequence,
}

pub struct HistoryService {
    config: Config,
    checker: LinkChecker,
    engine: FrecencyEngine,
    clock: Arc<dyn Clock>,
    state: Mutex<HistoryState>,
    notifier: ChangeNotifier,
}

impl HistoryService {
    /// Open history with the wall clock.
    ///
    /// # Errors
    ///
    /// See [`HistoryService::with_clock`].
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Open history, loading the snapshot at `storePath` when one is
    /// configured. Frecency is recomputed for every loaded record.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid settings and `Error::Store` if an
    /// existing snapshot cannot be read.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let checker = config.link_checker();
        let engine = FrecencyEngine::new(config.frecency.clone());

        let mut store = match &config.store_path {
            Some(path) => {
                VisitStore::load(path).map_err(|e| Error::store("loading history", &e))?
            }
            None => VisitStore::new(),
        };

        let now = clock.now_micros();
        for record in store.records_mut() {
            engine.recompute(record, now);
        }
        let mut index = LinkIndex::new(config.links.max_links, checker.clone());
        index.rebuild(store.records().map(UrlRecord::to_link));

        debug!(
            "History opened with {} urls ({} ranked)",
            store.len(),
            index.len()
        );

        Ok(Self {
            checker,
            engine,
            clock,
            state: Mutex::new(HistoryState {
                store,
                index,
                times: VisitTimeSequence::default(),
            }),
            notifier: ChangeNotifier::new(),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn link_checker(&self) -> &LinkChecker {
        &self.checker
    }

    /// Start event delivery. Safe to call more than once.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn init(&self) {
        if self.notifier.init() {
            info!("History provider initialized");
        }
    }

    /// Detach all subscribers. Safe to call more than once.
    pub fn uninit(&self) {
        if self.notifier.uninit() {
            info!("History provider uninitialized");
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.notifier.is_initialized()
    }

    /// Subscribe to an event kind.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInitialized` unless the provider is initialized.
    pub fn on(&self, kind: EventKind, handler: Handler) -> Result<()> {
        self.notifier.on(kind, handler)
    }

    /// Subscribe by event name (`linkChanged`, `deleteURI`, ...).
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownEvent` for an unrecognized name and
    /// `Error::NotInitialized` unless the provider is initialized.
    pub fn on_named(&self, name: &str, handler: Handler) -> Result<()> {
        self.on(name.parse::<EventKind>()?, handler)
    }

    /// Unsubscribe a handler previously passed to `on`. Returns whether it
    /// was subscribed.
    pub fn off(&self, kind: EventKind, handler: &Handler) -> bool {
        self.notifier.off(kind, handler)
    }

    /// Wait until every event emitted so far has been delivered
    pub async fn settled(&self) {
        self.notifier.settled().await;
    }

    /// Total visit rows across all urls
    pub async fn count(&self) -> usize {
        self.state.lock().await.store.count()
    }

    /// Best `min(limit, maxLinks)` links, defaulting to `maxLinks`
    pub async fn get_top_frecent_sites(&self, limit: Option<usize>) -> Vec<Link> {
        let limit = limit.unwrap_or(self.config.links.max_links);
        self.state.lock().await.index.top(limit)
    }

    /// Frecency and ranking data for one url, if it has history
    pub async fn get_link(&self, url: &str) -> Option<Link> {
        self.state.lock().await.store.get(url).map(UrlRecord::to_link)
    }

    /// Record one visit.
    ///
    /// # Errors
    ///
    /// See [`HistoryService::add_visits`].
    pub async fn add_visit(&self, visit: impl Into<VisitInput>) -> Result<usize> {
        self.add_visits([visit.into()]).await
    }

    /// Record a batch of visits atomically and return how many were added.
    ///
    /// Every url is checked before anything is written. Each affected url then
    /// gets its frecency recomputed and emits `linkChanged` for insertion, for
    /// the frecency update, and, when the url is new or its title changed,
    /// once more with the settled title.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any url is ineligible or any referrer
    /// is malformed, and `Error::Store` if persisting fails. Either way the
    /// store is left unchanged and nothing is emitted.
    pub async fn add_visits<I>(&self, inputs: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<VisitInput>,
    {
        let inputs: Vec<VisitInput> = inputs.into_iter().map(Into::into).collect();
        for input in &inputs {
            self.validate(input)?;
        }
        if inputs.is_empty() {
            return Ok(0);
        }

        let mut guard = self.state.lock().await;
        self.notifier.settled().await;
        let state = &mut *guard;

        let visits: Vec<Visit> = inputs
            .into_iter()
            .map(|input| input.into_visit(|| state.times.next(self.clock.as_ref())))
            .collect();
        let added = visits.len();

        let backup = state
            .store
            .backup(visits.iter().map(|visit| visit.url.as_str()));
        let affected = state.store.append(visits);

        let now = self.clock.now_micros();
        for url in &affected {
            if let Some(record) = state.store.get_mut(url) {
                self.engine.recompute(record, now);
            }
        }

        if let Err(e) = self.persist(&state.store).await {
            error!("Rolling back {} visit(s): {}", added, e);
            state.store.restore(backup);
            return Err(e);
        }

        for url in &affected {
            let Some(record) = state.store.get(url) else {
                continue;
            };
            let current = record.to_link();
            state.index.upsert(current.clone());

            let previous = backup
                .iter()
                .find(|(backed_up, _)| backed_up == url)
                .and_then(|(_, previous)| previous.as_ref());
            // A url without prior history always settles its title
            let (prior_frecency, prior_title) = previous
                .map_or((PROVISIONAL_FRECENCY, None), |p| {
                    (p.frecency, Some(p.title.as_str()))
                });
            let title_changed = prior_title != Some(current.title.as_str());
            let prior_title = prior_title.unwrap_or_default().to_string();

            let inserted = Link {
                frecency: prior_frecency,
                title: prior_title.clone(),
                ..current.clone()
            };
            let rescored = Link {
                title: prior_title,
                ..current.clone()
            };

            self.notifier.emit(LinkEvent::LinkChanged { link: inserted });
            self.notifier.emit(LinkEvent::LinkChanged { link: rescored });
            if title_changed {
                self.notifier.emit(LinkEvent::LinkChanged { link: current });
            }
        }

        debug!("Added {} visit(s) across {} url(s)", added, affected.len());
        Ok(added)
    }

    /// Delete a url and all its visits. Returns `false` when the url had no
    /// history; nothing is emitted in that case.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if persisting fails; the record is kept.
    pub async fn remove(&self, url: &str) -> Result<bool> {
        let mut guard = self.state.lock().await;
        self.notifier.settled().await;
        let state = &mut *guard;

        let Some(record) = state.store.remove(url) else {
            debug!("Nothing to remove for {}", url);
            return Ok(false);
        };

        if let Err(e) = self.persist(&state.store).await {
            error!("Rolling back removal of {}: {}", url, e);
            state.store.restore(vec![(url.to_string(), Some(record))]);
            return Err(e);
        }

        state.index.remove(url);
        self.notifier.emit(LinkEvent::DeleteUri {
            url: url.to_string(),
        });
        debug!("Removed {} ({} visits)", url, record.visit_count());
        Ok(true)
    }

    /// Delete all history. Completes only after `clearHistory` and every
    /// earlier event have been delivered.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if persisting fails; history is kept.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut guard = self.state.lock().await;
            self.notifier.settled().await;
            let state = &mut *guard;

            let taken = state.store.take_all();
            if let Err(e) = self.persist(&state.store).await {
                error!("Rolling back history clear: {}", e);
                state.store.restore_all(taken);
                return Err(e);
            }

            state.index.clear();
            self.notifier.emit(LinkEvent::ClearHistory);
            info!("Cleared history ({} urls)", taken.len());
        }

        self.notifier.settled().await;
        Ok(())
    }

    /// Re-score every record against the current time. Returns how many
    /// frecencies changed.
    ///
    /// Emits a single `manyLinksChanged` whenever history is non-empty,
    /// never per-url `linkChanged`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if persisting fails; previous scores are kept.
    pub async fn decay_all(&self) -> Result<usize> {
        let mut guard = self.state.lock().await;
        self.notifier.settled().await;
        let state = &mut *guard;

        if state.store.is_empty() {
            debug!("Decay skipped, history is empty");
            return Ok(0);
        }

        let now = self.clock.now_micros();
        let mut previous: Vec<(String, i64)> = Vec::with_capacity(state.store.len());
        for record in state.store.records_mut() {
            let before = record.frecency;
            if self.engine.recompute(record, now) != before {
                previous.push((record.url.clone(), before));
            }
        }

        if let Err(e) = self.persist(&state.store).await {
            error!("Rolling back decay pass: {}", e);
            for (url, frecency) in previous {
                if let Some(record) = state.store.get_mut(&url) {
                    record.frecency = frecency;
                }
            }
            return Err(e);
        }

        state
            .index
            .rebuild(state.store.records().map(UrlRecord::to_link));
        self.notifier.emit(LinkEvent::ManyLinksChanged);
        info!(
            "Decay pass rescored {} of {} urls",
            previous.len(),
            state.store.len()
        );
        Ok(previous.len())
    }

    fn validate(&self, input: &VisitInput) -> Result<()> {
        self.checker.check(&input.url)?;
        if let Some(referrer) = &input.referrer
            && split_scheme(referrer).is_none()
        {
            return Err(Error::InvalidInput(format!(
                "malformed referrer: {referrer}"
            )));
        }
        Ok(())
    }

    /// Write the snapshot on the blocking pool. Callers hold the state lock,
    /// so writes never interleave.
    async fn persist(&self, store: &VisitStore) -> Result<()> {
        let Some(path) = self.config.store_path.clone() else {
            return Ok(());
        };
        let content = store
            .encode(self.clock.now_micros())
            .map_err(|e| Error::store("saving history", &e))?;

        tokio::task::spawn_blocking(move || write_snapshot(&path, &content))
            .await
            .map_err(|e| Error::Store(format!("saving history: {e}")))?
            .map_err(|e| Error::store("saving history", &e))?;
        debug!("Saved {} history records", store.len());
        Ok(())
    }
}

impl std::fmt::Debug for HistoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryService")
            .field("config", &self.config)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

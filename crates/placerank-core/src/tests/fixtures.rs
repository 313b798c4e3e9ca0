//! Test fixtures and helpers

use crate::clock::{Clock, MICROS_PER_DAY, ManualClock};
use crate::config::Config;
use crate::notify::Handler;
use crate::{EventKind, HistoryService, LinkEvent};
use std::sync::{Arc, Mutex};

/// Fixed "now" for tests: 2023-11-14T22:13:20Z
pub const NOW: i64 = 1_700_000_000_000_000;

pub const DAY: i64 = MICROS_PER_DAY;

/// A service on a frozen clock at `NOW`
pub fn service_with(config: Config) -> (HistoryService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    let shared: Arc<dyn Clock> = clock.clone();
    let service = HistoryService::with_clock(config, shared).unwrap();
    (service, clock)
}

/// An in-memory service with default config on a frozen clock
pub fn memory_service() -> (HistoryService, Arc<ManualClock>) {
    service_with(Config::default())
}

/// Records every delivered event, in delivery order
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<LinkEvent>>>,
}

impl EventLog {
    pub fn handler(&self) -> Handler {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: &LinkEvent| events.lock().unwrap().push(event.clone()))
    }

    /// Subscribe to every event kind
    pub fn attach(&self, service: &HistoryService) {
        for kind in EventKind::ALL {
            service.on(kind, self.handler()).unwrap();
        }
    }

    pub fn events(&self) -> Vec<LinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }
}

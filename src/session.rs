// Per-session application state: the current upload's dealer map, the
// selected dealer and an inactivity clock. Owned by whoever drives the UI and
// passed down explicitly.
use crate::types::{DealerMap, DealerMetrics};
use log::info;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Session {
    dealers: DealerMap,
    selected: Option<String>,
    last_activity: Instant,
    timeout: Duration,
}

impl Session {
    pub fn new(timeout: Duration) -> Self {
        Self::started_at(timeout, Instant::now())
    }

    pub fn started_at(timeout: Duration, now: Instant) -> Self {
        Session {
            dealers: DealerMap::new(),
            selected: None,
            last_activity: now,
            timeout,
        }
    }

    /// Record user activity.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) >= self.timeout
    }

    /// Clear dealer data if the session has been idle too long. Returns
    /// whether anything was cleared.
    pub fn expire_if_idle(&mut self, now: Instant) -> bool {
        if !self.is_expired(now) {
            return false;
        }
        let had_data = !self.dealers.is_empty();
        self.clear();
        self.last_activity = now;
        if had_data {
            info!("session expired, dealer data cleared");
        }
        had_data
    }

    /// Replace the dealer map with a new upload's results.
    pub fn load_upload(&mut self, dealers: DealerMap) {
        self.dealers = dealers;
        self.selected = None;
    }

    pub fn clear(&mut self) {
        self.dealers.clear();
        self.selected = None;
    }

    pub fn dealers(&self) -> &DealerMap {
        &self.dealers
    }

    pub fn dealer_names(&self) -> Vec<&str> {
        self.dealers.keys().map(String::as_str).collect()
    }

    /// Select a dealer by name. Unknown names clear the selection.
    pub fn select(&mut self, name: &str) -> Option<&DealerMetrics> {
        if self.dealers.contains_key(name) {
            self.selected = Some(name.to_string());
        } else {
            self.selected = None;
        }
        self.selected_metrics()
    }

    pub fn selected_metrics(&self) -> Option<&DealerMetrics> {
        self.selected.as_ref().and_then(|n| self.dealers.get(n))
    }
}

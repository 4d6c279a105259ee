use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    models::location::LocationSample,
    services::{
        locations::LocationFeed,
        metrics::{ACTIVE_TRACKING_GAUGE, TRACKING_POLLS_COUNTER},
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    Idle,
    Tracking,
}

/// What the live map currently shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackingSnapshot {
    pub state: TrackingState,
    pub vehicle_id: Option<Uuid>,
    /// Last successfully fetched position; kept when a poll fails.
    pub position: Option<LocationSample>,
    pub updated_at: Option<DateTime<Utc>>,
    pub loading: bool,
    pub polls: u64,
}

/// Polls the location feed for one vehicle on a fixed interval.
///
/// `Idle -> Tracking -> Idle`. Each poll publishes to a watch channel so any
/// number of viewers can follow along.
pub struct TrackingLoop {
    feed: LocationFeed,
    interval: Duration,
    snapshot: Arc<watch::Sender<TrackingSnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl TrackingLoop {
    pub fn new(feed: LocationFeed, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(TrackingSnapshot::default());
        Self {
            feed,
            interval,
            snapshot: Arc::new(tx),
            task: None,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.snapshot.borrow().state
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackingSnapshot> {
        self.snapshot.subscribe()
    }

    /// Start tracking `vehicle_id` and wait for the first poll to land.
    /// Calling it while already tracking restarts the loop.
    pub async fn start(&mut self, vehicle_id: Uuid) -> TrackingSnapshot {
        let rx = self.arm(vehicle_id);
        settle(rx).await
    }

    /// Switch to `Tracking` and spawn the poll task: one poll right away,
    /// then one per interval. Never awaits, so the state and the task change
    /// together even if the caller goes away.
    pub fn arm(&mut self, vehicle_id: Uuid) -> watch::Receiver<TrackingSnapshot> {
        self.halt();

        self.snapshot.send_modify(|s| {
            if s.vehicle_id != Some(vehicle_id) {
                s.position = None;
                s.updated_at = None;
                s.polls = 0;
            }
            s.state = TrackingState::Tracking;
            s.vehicle_id = Some(vehicle_id);
            s.loading = true;
        });
        let rx = self.snapshot.subscribe();

        let feed = self.feed.clone();
        let snapshot = self.snapshot.clone();
        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            // A slow poll delays the next tick instead of bunching them up.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_fetched = None;
            loop {
                poll_once(&feed, &snapshot, vehicle_id, &mut last_fetched).await;
                ticker.tick().await;
            }
        }));
        ACTIVE_TRACKING_GAUGE.inc();
        info!("Tracking started for vehicle {}", vehicle_id);

        rx
    }

    /// Stop polling. Nothing is queried after this returns.
    pub fn stop(&mut self) {
        if self.halt() {
            info!("Tracking stopped");
        }
        self.snapshot.send_modify(|s| {
            s.state = TrackingState::Idle;
            s.loading = false;
        });
    }

    /// Cancel the poll task; returns whether one was running.
    fn halt(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                ACTIVE_TRACKING_GAUGE.dec();
                true
            }
            None => false,
        }
    }
}

impl Drop for TrackingLoop {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Wait until the pending poll has landed (or the loop went away).
async fn settle(mut rx: watch::Receiver<TrackingSnapshot>) -> TrackingSnapshot {
    let settled = rx.wait_for(|s| !s.loading).await.map(|s| (*s).clone());
    settled.unwrap_or_else(|_| rx.borrow().clone())
}

/// Fetch the latest sample and publish it.
///
/// When the feed hands back the same sample as last time the displayed
/// position drifts from where it was instead; the drift is never recorded.
async fn poll_once(
    feed: &LocationFeed,
    snapshot: &watch::Sender<TrackingSnapshot>,
    vehicle_id: Uuid,
    last_fetched: &mut Option<Uuid>,
) {
    match feed.latest(vehicle_id).await {
        Ok(sample) => {
            TRACKING_POLLS_COUNTER.with_label_values(&["ok"]).inc();
            let unchanged = last_fetched.replace(sample.id) == Some(sample.id);
            snapshot.send_modify(|s| {
                let shown = match s.position.take() {
                    Some(prev) if unchanged => {
                        let p = feed.drift(prev.point());
                        LocationSample {
                            latitude: p.latitude,
                            longitude: p.longitude,
                            ..sample
                        }
                    }
                    _ => sample,
                };
                s.position = Some(shown);
                s.updated_at = Some(Utc::now());
                s.loading = false;
                s.polls += 1;
            });
        }
        Err(e) => {
            TRACKING_POLLS_COUNTER.with_label_values(&["error"]).inc();
            warn!(
                "Location poll failed for vehicle {}, keeping last position: {}",
                vehicle_id, e
            );
            snapshot.send_modify(|s| s.loading = false);
        }
    }
}

/// One tracking loop per account.
pub struct TrackingRegistry {
    feed: LocationFeed,
    interval: Duration,
    loops: Mutex<HashMap<Uuid, TrackingLoop>>,
}

impl TrackingRegistry {
    pub fn new(feed: LocationFeed, interval: Duration) -> Self {
        Self {
            feed,
            interval,
            loops: Mutex::new(HashMap::new()),
        }
    }

    /// The first poll is awaited after the map lock is released, so a slow
    /// store never holds up other accounts.
    pub async fn start(&self, account_id: Uuid, vehicle_id: Uuid) -> TrackingSnapshot {
        let rx = {
            let mut loops = self.loops.lock().await;
            loops
                .entry(account_id)
                .or_insert_with(|| TrackingLoop::new(self.feed.clone(), self.interval))
                .arm(vehicle_id)
        };
        settle(rx).await
    }

    pub async fn stop(&self, account_id: Uuid) -> TrackingSnapshot {
        let mut loops = self.loops.lock().await;
        match loops.get_mut(&account_id) {
            Some(tracker) => {
                tracker.stop();
                tracker.snapshot()
            }
            None => TrackingSnapshot::default(),
        }
    }

    /// Stop the account's loop only if it follows one of `vehicle_ids`.
    pub async fn stop_if_tracking(&self, account_id: Uuid, vehicle_ids: &[Uuid]) {
        let mut loops = self.loops.lock().await;
        if let Some(tracker) = loops.get_mut(&account_id) {
            let current = tracker.snapshot().vehicle_id;
            if tracker.state() == TrackingState::Tracking
                && current.is_some_and(|v| vehicle_ids.contains(&v))
            {
                tracker.stop();
            }
        }
    }

    pub async fn snapshot(&self, account_id: Uuid) -> TrackingSnapshot {
        let loops = self.loops.lock().await;
        loops
            .get(&account_id)
            .map(TrackingLoop::snapshot)
            .unwrap_or_default()
    }

    /// Follow the account's loop, creating an idle one if needed.
    pub async fn subscribe(&self, account_id: Uuid) -> watch::Receiver<TrackingSnapshot> {
        let mut loops = self.loops.lock().await;
        loops
            .entry(account_id)
            .or_insert_with(|| TrackingLoop::new(self.feed.clone(), self.interval))
            .subscribe()
    }

    /// Drop the account's loop entirely; subscribers see the channel close.
    pub async fn forget(&self, account_id: Uuid) {
        if self.loops.lock().await.remove(&account_id).is_some() {
            info!("Tracking loop discarded for account {}", account_id);
        }
    }
}

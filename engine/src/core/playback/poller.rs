//! Caption Poller
//!
//! Background task that keeps the "active caption" signal current while media
//! plays. Each sample reads the clock, takes a fresh timeline snapshot and
//! runs the synchronizer; subscribers are notified only when the active
//! caption actually changes.
//!
//! The task must be stopped before the media source it samples is swapped or
//! torn down. [`CaptionPoller::stop`] waits for it to finish; dropping the
//! poller stops it as well.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::{ActiveCaption, ClockKind, Lookup, PlaybackClock};
use crate::core::{captions::SharedTimeline, settings::PlaybackSettings, TimeSec};

/// How the host should drive a poller for a given clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollMode {
    /// Sample on a fixed interval
    Timer(Duration),
    /// Feed the poller the surface's own time-update notifications
    TimeUpdates,
}

impl PollMode {
    pub fn for_clock(kind: ClockKind, settings: &PlaybackSettings) -> Self {
        match kind {
            ClockKind::NativeMedia => Self::TimeUpdates,
            ClockKind::EmbeddedPlayer => Self::Timer(settings.poll_interval()),
        }
    }
}

/// Handle to a running caption poll task
#[derive(Debug)]
pub struct CaptionPoller {
    active_rx: watch::Receiver<Option<ActiveCaption>>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CaptionPoller {
    /// Polls `clock` every `interval`.
    ///
    /// Must be called from within a Tokio runtime. Clock read failures skip the
    /// tick; embedded players routinely fail while they are still loading.
    pub fn spawn_timer(
        timeline: SharedTimeline,
        clock: Arc<dyn PlaybackClock>,
        interval: Duration,
        lookup: Lookup,
    ) -> Self {
        let (active_tx, active_rx) = watch::channel(None);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => match clock.current_time() {
                        Ok(time) => publish(&active_tx, &timeline, time, lookup),
                        Err(e) => debug!("Skipping caption poll: {}", e),
                    },
                }
            }
            debug!("Caption poller stopped");
        });

        Self {
            active_rx,
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Recomputes the active caption for every time update received.
    ///
    /// Must be called from within a Tokio runtime. The task ends when the
    /// sending side of `times` is dropped.
    pub fn spawn_event_driven(
        timeline: SharedTimeline,
        mut times: mpsc::UnboundedReceiver<TimeSec>,
        lookup: Lookup,
    ) -> Self {
        let (active_tx, active_rx) = watch::channel(None);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    next = times.recv() => match next {
                        Some(time) => publish(&active_tx, &timeline, time, lookup),
                        None => {
                            debug!("Time update channel closed");
                            break;
                        }
                    },
                }
            }
            debug!("Caption poller stopped");
        });

        Self {
            active_rx,
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Receiver that is notified whenever the active caption changes
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveCaption>> {
        self.active_rx.clone()
    }

    /// The most recently published active caption
    pub fn current(&self) -> Option<ActiveCaption> {
        self.active_rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the task and waits for it to exit
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Caption poller task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for CaptionPoller {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn publish(
    active_tx: &watch::Sender<Option<ActiveCaption>>,
    timeline: &SharedTimeline,
    time: TimeSec,
    lookup: Lookup,
) {
    let snapshot = timeline.snapshot();
    let next = match lookup.find(&snapshot, time) {
        Ok(found) => found.map(ActiveCaption::from),
        // Show nothing rather than guess between conflicting captions
        Err(_) => None,
    };

    active_tx.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        debug!(
            "Active caption at {:.3}s: {:?}",
            time,
            next.as_ref().map(|c| c.id.as_str())
        );
        *current = next;
        true
    });
}

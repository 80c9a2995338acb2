//! Background loops: the periodic sweep and the roadmap event listener.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use upnext_core::RoadmapEvent;

use crate::scheduler::NotificationScheduler;

/// Runs [`NotificationScheduler::sweep`] on a fixed interval until shut down.
pub struct SweepRunner {
    scheduler: Arc<NotificationScheduler>,
    shutdown: watch::Receiver<bool>,
}

impl SweepRunner {
    /// Create a runner and the sender that stops it.
    pub fn new(scheduler: Arc<NotificationScheduler>) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                scheduler,
                shutdown: rx,
            },
            tx,
        )
    }

    /// Spawn the loop. The first sweep runs immediately.
    pub fn run(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.scheduler.config().sweep_interval();
            info!(period_secs = period.as_secs(), "Sweep runner started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.scheduler.sweep(chrono::Utc::now()).await {
                            warn!(error = %e, "Sweep failed");
                        }
                    }
                    changed = self.shutdown.changed() => {
                        if changed.is_err() || *self.shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Sweep runner stopped");
        })
    }
}

/// Forward roadmap events to the scheduler until the sender side is dropped.
pub fn spawn_event_listener(
    scheduler: Arc<NotificationScheduler>,
    mut events: mpsc::UnboundedReceiver<RoadmapEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(user_id = %event.user_id(), "Roadmap event received");
            if let Err(e) = scheduler.on_task_completed(&event).await {
                warn!(error = %e, "Failed to seed follow-up reminder");
            }
        }
    })
}

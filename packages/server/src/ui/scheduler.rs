//! Periodic telemetry tasks.
//!
//! | interval | task |
//! |---|---|
//! | 1 s | `network:realtime` |
//! | 5 s | `network:metrics` |
//! | 10 s | `sensors:data` |
//! | 60 s | network history pruning |

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use super::state::AppState;

const REALTIME_INTERVAL: Duration = Duration::from_secs(1);
const DETAILED_INTERVAL: Duration = Duration::from_secs(5);
const SENSOR_INTERVAL: Duration = Duration::from_secs(10);
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Background tick tasks; aborted when dropped.
pub struct Scheduler {
    tasks: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(state: Arc<AppState>) -> Self {
        let monitor = state.network_monitor_usecase.clone();
        let realtime = spawn_every("network:realtime", REALTIME_INTERVAL, move || {
            let monitor = monitor.clone();
            async move {
                if let Err(e) = monitor.tick_realtime().await {
                    tracing::warn!("Failed to broadcast realtime metrics: {}", e);
                }
            }
        });

        let monitor = state.network_monitor_usecase.clone();
        let detailed = spawn_every("network:metrics", DETAILED_INTERVAL, move || {
            let monitor = monitor.clone();
            async move {
                if let Err(e) = monitor.tick_detailed().await {
                    tracing::warn!("Failed to broadcast detailed metrics: {}", e);
                }
            }
        });

        let sensors = state.sensor_network_usecase.clone();
        let sensor = spawn_every("sensors:data", SENSOR_INTERVAL, move || {
            let sensors = sensors.clone();
            async move {
                if let Err(e) = sensors.tick().await {
                    tracing::warn!("Failed to broadcast sensor data: {}", e);
                }
            }
        });

        let monitor = state.network_monitor_usecase.clone();
        let prune = spawn_every("network:prune", PRUNE_INTERVAL, move || {
            let monitor = monitor.clone();
            async move {
                monitor.prune_history().await;
            }
        });

        Self {
            tasks: vec![realtime, detailed, sensor, prune],
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn spawn_every<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 最初の tick は即座に完了するので読み捨てる
        ticker.tick().await;
        tracing::debug!(task = name, ?period, "scheduler task started");
        loop {
            ticker.tick().await;
            tick().await;
        }
    })
}

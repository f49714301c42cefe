//! UseCase: ネットワークモニタ
//!
//! 合成メトリクスの生成（1 秒 / 5 秒）、履歴の整理（60 秒）、HTTP リクエストの計測、
//! `network:ping` への応答を扱います。タイマーは UI 層のスケジューラが持ち、
//! ここでは 1 回分の tick だけを実装します。

use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use farmhub_shared::time::Clock;

use crate::{
    domain::{
        ConnectionId, HistoryEntry, MessagePushError, MessagePusher, Namespace, NetworkMetrics,
        NetworkMonitor, PresenceRepository,
        metrics::{DETAILED_HISTORY_POINTS, NetworkTopology},
    },
    infrastructure::dto::{
        http::NetworkStatusDto,
        websocket::{DetailedMetricsDto, ServerEvent},
    },
};

use super::dispatch::EventDispatcher;

pub struct NetworkMonitorUseCase {
    monitor: Mutex<NetworkMonitor>,
    rng: Mutex<StdRng>,
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
    clock: Arc<dyn Clock>,
}

impl NetworkMonitorUseCase {
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_rng(repository, message_pusher, clock, StdRng::from_os_rng())
    }

    /// 乱数源を指定して作成（テスト用に決定的な値を得たい場合）
    pub fn with_rng(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        let started_at = clock.now_millis();
        Self {
            monitor: Mutex::new(NetworkMonitor::new(started_at)),
            rng: Mutex::new(rng),
            repository,
            dispatcher: EventDispatcher::new(message_pusher),
            clock,
        }
    }

    pub async fn track_connection(
        &self,
        connection_id: ConnectionId,
        user_agent: Option<String>,
        ip: Option<String>,
    ) {
        let now = self.clock.now_millis();
        let mut monitor = self.monitor.lock().await;
        monitor.track_connection(connection_id, user_agent, ip, now);
    }

    pub async fn remove_connection(&self, connection_id: &ConnectionId) {
        let mut monitor = self.monitor.lock().await;
        monitor.remove_connection(connection_id);
    }

    /// HTTP リクエスト 1 件分の計測値を記録
    pub async fn record_request(&self, duration_ms: f64, success: bool) {
        let mut monitor = self.monitor.lock().await;
        monitor.record_request(duration_ms, success);
    }

    /// `network:ping` への応答: 受信データに `serverTime` を付けて送り返す
    pub async fn ping(
        &self,
        connection_id: &ConnectionId,
        mut data: Map<String, Value>,
    ) -> Result<(), MessagePushError> {
        let now = self.clock.now_millis();
        let bytes = Value::Object(data.clone()).to_string().len() as u64;
        {
            let mut monitor = self.monitor.lock().await;
            monitor.record_activity(connection_id, bytes, now);
        }

        data.insert("serverTime".to_string(), Value::from(now));
        self.dispatcher
            .send_to(connection_id, &ServerEvent::NetworkPong(data))
            .await
    }

    /// `request:network:status` への応答
    pub async fn send_status(&self, connection_id: &ConnectionId) -> Result<(), MessagePushError> {
        let status = self.status().await;
        self.dispatcher
            .send_to(connection_id, &ServerEvent::NetworkStatus(status))
            .await
    }

    /// 1 秒ごと: リアルタイム値を生成し `network:realtime` を配信
    pub async fn tick_realtime(&self) -> Result<HistoryEntry, MessagePushError> {
        let now = self.clock.now_millis();
        let active = self.repository.connection_count().await;
        let entry = {
            let mut monitor = self.monitor.lock().await;
            let mut rng = self.rng.lock().await;
            monitor.sample_realtime(active, now, &mut *rng)
        };

        let targets = self.repository.connections(Namespace::Default).await;
        self.dispatcher
            .send_to_many(targets, &ServerEvent::NetworkRealtime(entry.clone()))
            .await?;
        Ok(entry)
    }

    /// 5 秒ごと: 集計値を更新し `network:metrics` を配信
    pub async fn tick_detailed(&self) -> Result<(), MessagePushError> {
        let payload = {
            let mut monitor = self.monitor.lock().await;
            monitor.refresh_aggregates();
            DetailedMetricsDto {
                metrics: monitor.metrics().clone(),
                history: monitor.recent_history(DETAILED_HISTORY_POINTS),
            }
        };

        let targets = self.repository.connections(Namespace::Default).await;
        self.dispatcher
            .send_to_many(targets, &ServerEvent::NetworkMetrics(payload))
            .await
    }

    /// 60 秒ごと: 1 時間より古い履歴を削除
    pub async fn prune_history(&self) -> usize {
        let now = self.clock.now_millis();
        let mut monitor = self.monitor.lock().await;
        let removed = monitor.prune_history(now);
        if removed > 0 {
            tracing::debug!(removed, "pruned network history");
        }
        removed
    }

    pub async fn metrics(&self) -> NetworkMetrics {
        let monitor = self.monitor.lock().await;
        monitor.metrics().clone()
    }

    pub async fn topology(&self) -> NetworkTopology {
        let now = self.clock.now_millis();
        let total = self.repository.connection_count().await;
        let occupancy = self.repository.occupancy().await;
        let uptime = self.monitor.lock().await.uptime_secs(now);
        NetworkTopology::build(total, occupancy, uptime)
    }

    /// `GET /api/network/status` の本体
    pub async fn status(&self) -> NetworkStatusDto {
        let topology = self.topology().await;
        let monitor = self.monitor.lock().await;
        NetworkStatusDto {
            metrics: monitor.metrics().clone(),
            topology,
            connection_details: monitor.connection_details(),
        }
    }
}

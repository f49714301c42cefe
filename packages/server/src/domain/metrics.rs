//! ネットワークモニタのドメインモデル
//!
//! 実際のネットワーク計測は行わず、接続数と乱数から合成した値を生成します。
//! 時刻と乱数源は引数で受け取るため、タイマーを待たずにテストできます。

use std::collections::{BTreeMap, HashMap, VecDeque};

use rand::Rng;
use serde::Serialize;

use super::{ConnectionId, Namespace, RoomOccupancy};

/// 集計に使うリクエスト計測値の件数
pub const REQUEST_WINDOW: usize = 100;
/// 履歴の保持期間（1 時間）
pub const HISTORY_RETENTION_MS: i64 = 60 * 60 * 1000;
/// 詳細メトリクスに含める履歴の点数
pub const DETAILED_HISTORY_POINTS: usize = 60;

const BASE_LATENCY_MS: f64 = 15.0;

/// サーバー全体のメトリクス
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetrics {
    pub active_connections: usize,
    pub total_requests: u64,
    /// 直近 `REQUEST_WINDOW` 件の平均応答時間（ミリ秒）
    pub average_response_time: u64,
    pub bandwidth_usage: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    /// 起動からの秒数
    pub uptime: u64,
    pub network_latency: u64,
    pub packets_transmitted: u64,
    pub packets_received: u64,
    /// 直近 `REQUEST_WINDOW` 件のエラー率（%）
    pub error_rate: u64,
}

/// グラフ表示用の履歴 1 点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: i64,
    pub connections: usize,
    pub bandwidth: u64,
    pub latency: u64,
    pub cpu: f64,
    pub memory: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RequestSample {
    duration_ms: f64,
    success: bool,
}

/// 接続ごとの通信状況
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetail {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub connected_at: i64,
    pub last_activity: i64,
    pub data_transferred: u64,
}

/// ルームごとの利用状況
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUsage {
    pub user_count: usize,
    pub users: Vec<String>,
}

/// ネットワークトポロジー
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTopology {
    pub total_connections: usize,
    pub rooms: BTreeMap<String, RoomUsage>,
    pub namespaces: Vec<&'static str>,
    pub server_uptime: u64,
}

impl NetworkTopology {
    pub fn build(total_connections: usize, occupancy: Vec<RoomOccupancy>, server_uptime: u64) -> Self {
        let rooms = occupancy
            .into_iter()
            .map(|entry| {
                let users: Vec<String> = entry
                    .connections
                    .into_iter()
                    .map(ConnectionId::into_string)
                    .collect();
                (
                    entry.key.to_string(),
                    RoomUsage {
                        user_count: users.len(),
                        users,
                    },
                )
            })
            .collect();

        Self {
            total_connections,
            rooms,
            namespaces: Namespace::ALL.iter().map(Namespace::path).collect(),
            server_uptime,
        }
    }
}

/// ネットワークモニタ本体
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    metrics: NetworkMetrics,
    started_at: i64,
    requests: VecDeque<RequestSample>,
    history: VecDeque<HistoryEntry>,
    connections: HashMap<ConnectionId, ConnectionDetail>,
}

impl NetworkMonitor {
    pub fn new(started_at: i64) -> Self {
        Self {
            metrics: NetworkMetrics::default(),
            started_at,
            requests: VecDeque::with_capacity(REQUEST_WINDOW),
            history: VecDeque::new(),
            connections: HashMap::new(),
        }
    }

    pub fn metrics(&self) -> &NetworkMetrics {
        &self.metrics
    }

    pub fn track_connection(
        &mut self,
        connection_id: ConnectionId,
        user_agent: Option<String>,
        ip: Option<String>,
        now: i64,
    ) {
        self.connections.insert(
            connection_id,
            ConnectionDetail {
                user_agent,
                ip,
                connected_at: now,
                last_activity: now,
                data_transferred: 0,
            },
        );
    }

    /// 接続の最終アクティビティと転送量を更新。未追跡の接続なら `false`
    pub fn record_activity(&mut self, connection_id: &ConnectionId, bytes: u64, now: i64) -> bool {
        match self.connections.get_mut(connection_id) {
            Some(detail) => {
                detail.last_activity = now;
                detail.data_transferred += bytes;
                true
            }
            None => false,
        }
    }

    pub fn remove_connection(&mut self, connection_id: &ConnectionId) {
        self.connections.remove(connection_id);
    }

    pub fn connection_details(&self) -> Vec<ConnectionDetail> {
        let mut details: Vec<ConnectionDetail> = self.connections.values().cloned().collect();
        details.sort_by_key(|detail| detail.connected_at);
        details
    }

    /// HTTP リクエストの応答時間を記録
    pub fn record_request(&mut self, duration_ms: f64, success: bool) {
        if self.requests.len() >= REQUEST_WINDOW {
            self.requests.pop_front();
        }
        self.requests.push_back(RequestSample {
            duration_ms,
            success,
        });
        self.metrics.total_requests += 1;
    }

    /// 1 秒ごとのリアルタイム値を生成し、履歴に追加
    pub fn sample_realtime<R: Rng + ?Sized>(
        &mut self,
        active_connections: usize,
        now: i64,
        rng: &mut R,
    ) -> HistoryEntry {
        let connections = active_connections as f64;

        let latency = BASE_LATENCY_MS + rng.random_range(0.0..10.0_f64);
        let connection_multiplier = (connections * 0.5).min(10.0);
        let bandwidth = rng.random_range(0.0..20.0_f64) + connection_multiplier;
        let cpu = (rng.random_range(0.0..25.0_f64) + connections * 2.0).min(100.0);
        let memory = 40.0 + rng.random_range(0.0..30.0_f64);

        self.metrics.active_connections = active_connections;
        self.metrics.cpu_usage = cpu;
        self.metrics.memory_usage = memory;
        self.metrics.uptime = self.uptime_secs(now);
        self.metrics.network_latency = latency.round() as u64;
        self.metrics.bandwidth_usage = bandwidth.round() as u64;
        self.metrics.packets_transmitted += rng.random_range(10..60u64);
        self.metrics.packets_received += rng.random_range(8..53u64);

        let entry = HistoryEntry {
            timestamp: now,
            connections: active_connections,
            bandwidth: self.metrics.bandwidth_usage,
            latency: self.metrics.network_latency,
            cpu,
            memory,
        };
        self.history.push_back(entry.clone());
        entry
    }

    /// 5 秒ごとの集計値（平均応答時間・エラー率）を更新
    pub fn refresh_aggregates(&mut self) {
        self.metrics.average_response_time = self.average_response_time();
        self.metrics.error_rate = self.error_rate();
    }

    pub fn average_response_time(&self) -> u64 {
        if self.requests.is_empty() {
            return 0;
        }
        let sum: f64 = self.requests.iter().map(|r| r.duration_ms).sum();
        (sum / self.requests.len() as f64).round() as u64
    }

    pub fn error_rate(&self) -> u64 {
        if self.requests.is_empty() {
            return 0;
        }
        let errors = self.requests.iter().filter(|r| !r.success).count();
        ((errors as f64 / self.requests.len() as f64) * 100.0).round() as u64
    }

    /// 保持期間を過ぎた履歴を削除し、削除件数を返す
    pub fn prune_history(&mut self, now: i64) -> usize {
        let cutoff = now - HISTORY_RETENTION_MS;
        let before = self.history.len();
        self.history.retain(|entry| entry.timestamp > cutoff);
        before - self.history.len()
    }

    /// 直近 `points` 件の履歴
    pub fn recent_history(&self, points: usize) -> Vec<HistoryEntry> {
        let skip = self.history.len().saturating_sub(points);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn uptime_secs(&self, now: i64) -> u64 {
        u64::try_from((now - self.started_at) / 1000).unwrap_or(0)
    }
}

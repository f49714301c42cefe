//! UseCase: IoT センサーネットワークのシミュレーション
//!
//! 10 秒ごとの読み取り値生成（`tick`）と、HTTP / WebSocket からのセンサー操作を扱います。

use std::{collections::BTreeMap, sync::Arc};

use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::Mutex;

use farmhub_shared::time::Clock;

use crate::{
    domain::{
        ConnectionId, MessagePushError, MessagePusher, Namespace, PresenceRepository, SensorError,
        SensorNetwork, SensorNetworkStatus, SensorSnapshot, SensorStatus,
    },
    infrastructure::dto::websocket::{SensorAction, SensorControlPayload, ServerEvent},
};

use super::{dispatch::EventDispatcher, error::SensorControlError};

pub struct SensorNetworkUseCase {
    network: Mutex<SensorNetwork>,
    rng: Mutex<StdRng>,
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
    clock: Arc<dyn Clock>,
}

impl SensorNetworkUseCase {
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_rng(repository, message_pusher, clock, StdRng::from_os_rng())
    }

    pub fn with_rng(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        mut rng: StdRng,
    ) -> Self {
        let network = SensorNetwork::with_default_zones(clock.now_millis(), &mut rng);
        Self {
            network: Mutex::new(network),
            rng: Mutex::new(rng),
            repository,
            dispatcher: EventDispatcher::new(message_pusher),
            clock,
        }
    }

    /// 10 秒ごと: 稼働中のセンサーの値を生成し、`sensors:data` を配信
    pub async fn tick(&self) -> Result<usize, MessagePushError> {
        let now = self.clock.now_millis();
        let (updated, snapshot) = {
            let mut network = self.network.lock().await;
            let mut rng = self.rng.lock().await;
            let updated = network.tick(now, &mut *rng);
            (updated, network.snapshot())
        };

        let targets = self.repository.connections(Namespace::Default).await;
        self.dispatcher
            .send_to_many(targets, &ServerEvent::SensorsData(snapshot))
            .await?;
        Ok(updated)
    }

    pub async fn toggle(&self, sensor_id: &str) -> Result<SensorStatus, SensorControlError> {
        let mut network = self.network.lock().await;
        let status = network.toggle(sensor_id)?;
        tracing::info!(sensor_id, ?status, "sensor toggled");
        Ok(status)
    }

    pub async fn calibrate(&self, sensor_id: &str) -> Result<(), SensorControlError> {
        let now = self.clock.now_millis();
        let mut network = self.network.lock().await;
        network.calibrate(sensor_id, now)?;
        tracing::info!(sensor_id, "sensor calibrated");
        Ok(())
    }

    /// `sensor:control`: 存在しないセンサーは無視する
    pub async fn control(&self, payload: SensorControlPayload) -> bool {
        let result = match payload.action {
            SensorAction::Toggle => self.toggle(&payload.sensor_id).await.map(|_| ()),
            SensorAction::Calibrate => self.calibrate(&payload.sensor_id).await,
        };
        match result {
            Ok(()) => true,
            Err(SensorControlError::Sensor(SensorError::NotFound(id))) => {
                tracing::debug!(sensor_id = %id, "ignoring control for unknown sensor");
                false
            }
        }
    }

    pub async fn status(&self) -> SensorNetworkStatus {
        let now = self.clock.now_millis();
        self.network.lock().await.status(now)
    }

    pub async fn data(&self) -> BTreeMap<String, SensorSnapshot> {
        self.network.lock().await.snapshot()
    }

    /// `request:sensors:data` への応答
    pub async fn send_status(&self, connection_id: &ConnectionId) -> Result<(), MessagePushError> {
        let status = self.status().await;
        self.dispatcher
            .send_to(connection_id, &ServerEvent::SensorsStatus(status))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{Harness, drain, event_names};

    fn usecase(harness: &Harness) -> SensorNetworkUseCase {
        SensorNetworkUseCase::with_rng(
            harness.repository.clone(),
            harness.pusher.clone(),
            harness.clock.clone(),
            StdRng::seed_from_u64(11),
        )
    }

    #[tokio::test]
    async fn test_tick_broadcasts_sensor_data() {
        // テスト項目: tick で稼働中の全センサーが更新され、既定の名前空間に sensors:data が届く
        // given (前提条件):
        let harness = Harness::new();
        let sensors = usecase(&harness);
        let (_alice, mut alice_rx) = harness.connect("alice", Namespace::Default).await;
        let (_q, mut query_rx) = harness.connect("q-1", Namespace::Queries).await;

        // when (操作):
        let updated = sensors.tick().await.unwrap();

        // then (期待する結果):
        assert_eq!(updated, 12);
        let events = drain(&mut alice_rx);
        assert_eq!(events[0]["event"], "sensors:data");
        let reading = &events[0]["data"]["field_a_soil_moisture"];
        assert_eq!(reading["sensor"]["type"], "soil_moisture");
        assert_eq!(reading["latestReading"]["unit"], "%");
        assert_eq!(reading["history"].as_array().unwrap().len(), 1);
        assert!(drain(&mut query_rx).is_empty());
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_active() {
        // テスト項目: 2 回切り替えると稼働中に戻り、オフラインの間は tick で更新されない
        // given (前提条件):
        let harness = Harness::new();
        let sensors = usecase(&harness);

        // when (操作):
        let first = sensors.toggle("field_a_temperature").await.unwrap();
        let updated = sensors.tick().await.unwrap();
        let second = sensors.toggle("field_a_temperature").await.unwrap();

        // then (期待する結果):
        assert_eq!(first, SensorStatus::Offline);
        assert_eq!(updated, 11);
        assert_eq!(second, SensorStatus::Active);
        assert!(sensors.data().await["field_a_temperature"].latest_reading.is_none());
    }

    #[tokio::test]
    async fn test_control_ignores_unknown_sensor() {
        // テスト項目: sensor:control で存在しないセンサーを指定しても何も起きない
        let harness = Harness::new();
        let sensors = usecase(&harness);

        let applied = sensors
            .control(SensorControlPayload {
                action: SensorAction::Calibrate,
                sensor_id: "barn_9_humidity".to_string(),
            })
            .await;

        assert!(!applied);
        assert!(matches!(
            sensors.toggle("barn_9_humidity").await,
            Err(SensorControlError::Sensor(SensorError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_send_status_replies_to_requester() {
        // テスト項目: ステータス要求には sensors:status を要求元にだけ返す
        let harness = Harness::new();
        let sensors = usecase(&harness);
        let (alice, mut alice_rx) = harness.connect("alice", Namespace::Default).await;
        let (_bob, mut bob_rx) = harness.connect("bob", Namespace::Default).await;

        sensors.send_status(&alice).await.unwrap();

        assert_eq!(event_names(&mut alice_rx), vec!["sensors:status"]);
        assert!(drain(&mut bob_rx).is_empty());
        let status = sensors.status().await;
        assert_eq!(status.total_sensors, 12);
        assert_eq!(status.active_sensors, 12);
    }
}

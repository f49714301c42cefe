//! IoT センサーネットワークのシミュレーション
//!
//! 圃場ゾーンごとに合成のセンサー値を生成します。物理デバイスとの通信は行わず、
//! toggle / calibrate はメモリ上のステータスのみを変更します。

use std::collections::{BTreeMap, HashMap, VecDeque};

use rand::Rng;
use serde::Serialize;

use super::SensorError;

/// センサーごとに保持する読み取り値の件数
pub const READING_HISTORY_CAPACITY: usize = 100;
/// ブロードキャストに含める読み取り値の件数
pub const BROADCAST_HISTORY_POINTS: usize = 20;

/// センサー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    SoilMoisture,
    Temperature,
    Humidity,
    PhLevel,
}

impl SensorType {
    pub const ALL: [SensorType; 4] = [
        SensorType::SoilMoisture,
        SensorType::Temperature,
        SensorType::Humidity,
        SensorType::PhLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::SoilMoisture => "soil_moisture",
            SensorType::Temperature => "temperature",
            SensorType::Humidity => "humidity",
            SensorType::PhLevel => "ph_level",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorType::SoilMoisture | SensorType::Humidity => "%",
            SensorType::Temperature => "°C",
            SensorType::PhLevel => "pH",
        }
    }

    /// 作物ごとの基準値。未知の作物は 50
    fn base_value(&self, crop: &str) -> f64 {
        match (self, crop) {
            (SensorType::SoilMoisture, "wheat") => 45.0,
            (SensorType::SoilMoisture, "rice") => 75.0,
            (SensorType::SoilMoisture, "tomato") => 60.0,
            (SensorType::Temperature, "wheat") => 22.0,
            (SensorType::Temperature, "rice") => 28.0,
            (SensorType::Temperature, "tomato") => 24.0,
            (SensorType::Humidity, "wheat") => 65.0,
            (SensorType::Humidity, "rice") => 80.0,
            (SensorType::Humidity, "tomato") => 70.0,
            (SensorType::PhLevel, "wheat") => 6.8,
            (SensorType::PhLevel, "rice") => 6.2,
            (SensorType::PhLevel, "tomato") => 6.5,
            _ => 50.0,
        }
    }
}

/// センサーの稼働状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Active,
    Offline,
}

impl SensorStatus {
    fn toggled(self) -> Self {
        match self {
            SensorStatus::Active => SensorStatus::Offline,
            SensorStatus::Offline => SensorStatus::Active,
        }
    }
}

/// 圃場ゾーン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmZone {
    pub id: &'static str,
    pub name: &'static str,
    pub crop: &'static str,
}

pub const DEFAULT_ZONES: [FarmZone; 3] = [
    FarmZone {
        id: "field_a",
        name: "Field A - Wheat",
        crop: "wheat",
    },
    FarmZone {
        id: "field_b",
        name: "Field B - Rice",
        crop: "rice",
    },
    FarmZone {
        id: "greenhouse_1",
        name: "Greenhouse 1 - Tomatoes",
        crop: "tomato",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: String,
    #[serde(rename = "type")]
    pub sensor_type: SensorType,
    pub zone: String,
    pub zone_name: String,
    pub crop: String,
    pub status: SensorStatus,
    pub battery: u8,
    pub last_update: i64,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub timestamp: i64,
    pub value: f64,
    pub unit: &'static str,
    pub quality: &'static str,
}

/// ブロードキャスト用のセンサーごとのスナップショット
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    pub sensor: Sensor,
    pub latest_reading: Option<SensorReading>,
    pub history: Vec<SensorReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    pub name: String,
    pub crop: String,
    pub sensors: Vec<Sensor>,
    pub active_sensors: usize,
    pub avg_battery: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorNetworkStatus {
    pub zones: BTreeMap<String, ZoneStatus>,
    pub protocols: BTreeMap<String, usize>,
    pub total_sensors: usize,
    pub active_sensors: usize,
    pub last_update: i64,
}

/// センサーネットワーク本体
#[derive(Debug, Clone)]
pub struct SensorNetwork {
    sensors: BTreeMap<String, Sensor>,
    readings: HashMap<String, VecDeque<SensorReading>>,
}

impl SensorNetwork {
    /// 既定のゾーン構成（3 ゾーン × 4 種別）でネットワークを初期化
    pub fn with_default_zones<R: Rng + ?Sized>(now: i64, rng: &mut R) -> Self {
        Self::new(&DEFAULT_ZONES, now, rng)
    }

    pub fn new<R: Rng + ?Sized>(zones: &[FarmZone], now: i64, rng: &mut R) -> Self {
        let mut sensors = BTreeMap::new();
        let mut readings = HashMap::new();

        for zone in zones {
            for sensor_type in SensorType::ALL {
                let id = format!("{}_{}", zone.id, sensor_type.as_str());
                sensors.insert(
                    id.clone(),
                    Sensor {
                        id: id.clone(),
                        sensor_type,
                        zone: zone.id.to_string(),
                        zone_name: zone.name.to_string(),
                        crop: zone.crop.to_string(),
                        status: SensorStatus::Active,
                        battery: rng.random_range(60..100),
                        last_update: now,
                        protocol: "WiFi".to_string(),
                    },
                );
                readings.insert(id, VecDeque::with_capacity(READING_HISTORY_CAPACITY));
            }
        }

        Self { sensors, readings }
    }

    pub fn sensor(&self, sensor_id: &str) -> Option<&Sensor> {
        self.sensors.get(sensor_id)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// 稼働中の全センサーに新しい読み取り値を生成し、更新したセンサー数を返す
    pub fn tick<R: Rng + ?Sized>(&mut self, now: i64, rng: &mut R) -> usize {
        let mut updated = 0;
        for (id, sensor) in self.sensors.iter_mut() {
            if sensor.status != SensorStatus::Active {
                continue;
            }
            let reading = SensorReading {
                timestamp: now,
                value: generate_value(sensor.sensor_type, &sensor.crop, rng),
                unit: sensor.sensor_type.unit(),
                quality: "good",
            };

            let history = self.readings.entry(id.clone()).or_default();
            if history.len() >= READING_HISTORY_CAPACITY {
                history.pop_front();
            }
            history.push_back(reading);

            sensor.last_update = now;
            updated += 1;
        }
        updated
    }

    /// active ↔ offline を切り替え、切り替え後の状態を返す
    pub fn toggle(&mut self, sensor_id: &str) -> Result<SensorStatus, SensorError> {
        let sensor = self
            .sensors
            .get_mut(sensor_id)
            .ok_or_else(|| SensorError::NotFound(sensor_id.to_string()))?;
        sensor.status = sensor.status.toggled();
        Ok(sensor.status)
    }

    /// バッテリーを 100 に戻す
    pub fn calibrate(&mut self, sensor_id: &str, now: i64) -> Result<(), SensorError> {
        let sensor = self
            .sensors
            .get_mut(sensor_id)
            .ok_or_else(|| SensorError::NotFound(sensor_id.to_string()))?;
        sensor.battery = 100;
        sensor.last_update = now;
        Ok(())
    }

    pub fn history(&self, sensor_id: &str) -> Vec<SensorReading> {
        self.readings
            .get(sensor_id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// センサーごとの最新値と直近の履歴
    pub fn snapshot(&self) -> BTreeMap<String, SensorSnapshot> {
        self.sensors
            .iter()
            .map(|(id, sensor)| {
                let history = self.readings.get(id);
                let latest_reading = history.and_then(|h| h.back().cloned());
                let recent = history
                    .map(|h| {
                        let skip = h.len().saturating_sub(BROADCAST_HISTORY_POINTS);
                        h.iter().skip(skip).cloned().collect()
                    })
                    .unwrap_or_default();
                (
                    id.clone(),
                    SensorSnapshot {
                        sensor: sensor.clone(),
                        latest_reading,
                        history: recent,
                    },
                )
            })
            .collect()
    }

    /// ゾーン別の稼働状況
    pub fn status(&self, now: i64) -> SensorNetworkStatus {
        let mut zones: BTreeMap<String, ZoneStatus> = BTreeMap::new();
        for sensor in self.sensors.values() {
            let zone = zones.entry(sensor.zone.clone()).or_insert_with(|| ZoneStatus {
                name: sensor.zone_name.clone(),
                crop: sensor.crop.clone(),
                sensors: Vec::new(),
                active_sensors: 0,
                avg_battery: 0,
            });
            if sensor.status == SensorStatus::Active {
                zone.active_sensors += 1;
            }
            zone.sensors.push(sensor.clone());
        }

        for zone in zones.values_mut() {
            let total: u32 = zone.sensors.iter().map(|s| u32::from(s.battery)).sum();
            let count = zone.sensors.len().max(1) as f64;
            zone.avg_battery = (f64::from(total) / count).round() as u8;
        }

        let active_sensors = self
            .sensors
            .values()
            .filter(|s| s.status == SensorStatus::Active)
            .count();

        SensorNetworkStatus {
            zones,
            protocols: BTreeMap::new(),
            total_sensors: self.sensors.len(),
            active_sensors,
            last_update: now,
        }
    }
}

/// 基準値 ±15% の範囲で値を生成し、小数第 2 位に丸める
fn generate_value<R: Rng + ?Sized>(sensor_type: SensorType, crop: &str, rng: &mut R) -> f64 {
    let base = sensor_type.base_value(crop);
    let variation = base * 0.15;
    let value = base + (rng.random::<f64>() - 0.5) * 2.0 * variation;
    (value * 100.0).round() / 100.0
}

//! Tourist telemetry record: the single input entity for training and inference

use serde::{Deserialize, Serialize};

/// Categorical fields, in the order their one-hot blocks appear in the feature vector.
pub const CATEGORICAL_FIELDS: [&str; 6] = [
    "time_of_day",
    "weather_condition",
    "crowd_density",
    "travel_mode",
    "booking_channel",
    "trip_purpose",
];

/// Numeric fields, in record order. These pass through the encoder unchanged.
pub const NUMERIC_FIELDS: [&str; 33] = [
    "latitude",
    "longitude",
    "altitude_m",
    "time_stationary_hr",
    "gps_shift_m",
    "speed_kmph",
    "avg_speed_last_30min",
    "distance_from_city_center_km",
    "geo_fence_violation",
    "altitude_change_m",
    "places_visited",
    "heart_rate_bpm",
    "blood_pressure_sys",
    "blood_pressure_dia",
    "oxygen_saturation_pct",
    "skin_temperature_c",
    "steps_last_hour",
    "stress_index",
    "hydration_level_pct",
    "temperature_c",
    "humidity_pct",
    "air_quality_index",
    "light_level_lux",
    "calamity_nearby",
    "area_risk_score",
    "sos_pressed",
    "last_checkin_min",
    "phone_battery_pct",
    "network_strength_dbm",
    "app_open_count_last_hr",
    "companion_count",
    "trip_duration_days",
    "spend_per_day_usd",
];

/// One telemetry snapshot for a tourist: location, vitals, environment and trip metadata.
///
/// Identifier and label columns (`tourist_id`, `timestamp`, `is_anomaly`) are not part
/// of the record; dataset rows carrying them deserialize into it with those columns ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouristRecord {
    // Location
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub time_stationary_hr: f64,
    pub gps_shift_m: f64,
    pub speed_kmph: f64,
    pub avg_speed_last_30min: f64,
    pub distance_from_city_center_km: f64,
    pub geo_fence_violation: i64,
    pub altitude_change_m: f64,
    /// e.g. "morning", "afternoon", "evening", "night"
    pub time_of_day: String,
    pub places_visited: i64,

    // Physiology
    pub heart_rate_bpm: i64,
    pub blood_pressure_sys: i64,
    pub blood_pressure_dia: i64,
    pub oxygen_saturation_pct: i64,
    pub skin_temperature_c: f64,
    pub steps_last_hour: i64,
    pub stress_index: i64,
    pub hydration_level_pct: i64,

    // Environment
    pub weather_condition: String,
    pub temperature_c: f64,
    pub humidity_pct: i64,
    pub air_quality_index: i64,
    pub crowd_density: String,
    pub light_level_lux: i64,
    pub calamity_nearby: i64,
    pub area_risk_score: i64,

    // Device and safety signals
    pub sos_pressed: i64,
    pub last_checkin_min: i64,
    pub phone_battery_pct: i64,
    pub network_strength_dbm: i64,
    pub app_open_count_last_hr: i64,

    // Trip metadata
    pub companion_count: i64,
    pub travel_mode: String,
    pub booking_channel: String,
    pub trip_duration_days: i64,
    pub spend_per_day_usd: f64,
    pub trip_purpose: String,
}

impl TouristRecord {
    /// Numeric fields as floats, in `NUMERIC_FIELDS` order.
    pub fn numeric_values(&self) -> [f64; 33] {
        [
            self.latitude,
            self.longitude,
            self.altitude_m,
            self.time_stationary_hr,
            self.gps_shift_m,
            self.speed_kmph,
            self.avg_speed_last_30min,
            self.distance_from_city_center_km,
            self.geo_fence_violation as f64,
            self.altitude_change_m,
            self.places_visited as f64,
            self.heart_rate_bpm as f64,
            self.blood_pressure_sys as f64,
            self.blood_pressure_dia as f64,
            self.oxygen_saturation_pct as f64,
            self.skin_temperature_c,
            self.steps_last_hour as f64,
            self.stress_index as f64,
            self.hydration_level_pct as f64,
            self.temperature_c,
            self.humidity_pct as f64,
            self.air_quality_index as f64,
            self.light_level_lux as f64,
            self.calamity_nearby as f64,
            self.area_risk_score as f64,
            self.sos_pressed as f64,
            self.last_checkin_min as f64,
            self.phone_battery_pct as f64,
            self.network_strength_dbm as f64,
            self.app_open_count_last_hr as f64,
            self.companion_count as f64,
            self.trip_duration_days as f64,
            self.spend_per_day_usd,
        ]
    }

    /// Categorical fields, in `CATEGORICAL_FIELDS` order.
    pub fn categorical_values(&self) -> [&str; 6] {
        [
            &self.time_of_day,
            &self.weather_condition,
            &self.crowd_density,
            &self.travel_mode,
            &self.booking_channel,
            &self.trip_purpose,
        ]
    }

    /// A distressed tourist: stationary at night in a storm, poor vitals, low battery.
    pub fn distress_example() -> Self {
        Self {
            latitude: 27.1,
            longitude: 78.3,
            altitude_m: 180.0,
            time_stationary_hr: 11.0,
            gps_shift_m: 1200.0,
            speed_kmph: 1.2,
            avg_speed_last_30min: 0.8,
            distance_from_city_center_km: 8.0,
            geo_fence_violation: 1,
            altitude_change_m: 10.0,
            time_of_day: "night".to_string(),
            places_visited: 2,
            heart_rate_bpm: 165,
            blood_pressure_sys: 180,
            blood_pressure_dia: 110,
            oxygen_saturation_pct: 90,
            skin_temperature_c: 36.0,
            steps_last_hour: 50,
            stress_index: 85,
            hydration_level_pct: 60,
            weather_condition: "storm".to_string(),
            temperature_c: 27.0,
            humidity_pct: 88,
            air_quality_index: 120,
            crowd_density: "low".to_string(),
            light_level_lux: 10,
            calamity_nearby: 1,
            area_risk_score: 70,
            sos_pressed: 0,
            last_checkin_min: 300,
            phone_battery_pct: 25,
            network_strength_dbm: -100,
            app_open_count_last_hr: 1,
            companion_count: 0,
            travel_mode: "walk".to_string(),
            booking_channel: "app".to_string(),
            trip_duration_days: 5,
            spend_per_day_usd: 120.0,
            trip_purpose: "adventure".to_string(),
        }
    }
}

impl Default for TouristRecord {
    /// A calm daytime sightseeing snapshot.
    fn default() -> Self {
        Self {
            latitude: 27.17,
            longitude: 78.04,
            altitude_m: 170.0,
            time_stationary_hr: 0.5,
            gps_shift_m: 15.0,
            speed_kmph: 4.0,
            avg_speed_last_30min: 3.5,
            distance_from_city_center_km: 2.0,
            geo_fence_violation: 0,
            altitude_change_m: 2.0,
            time_of_day: "afternoon".to_string(),
            places_visited: 4,
            heart_rate_bpm: 78,
            blood_pressure_sys: 118,
            blood_pressure_dia: 78,
            oxygen_saturation_pct: 98,
            skin_temperature_c: 33.5,
            steps_last_hour: 2400,
            stress_index: 25,
            hydration_level_pct: 85,
            weather_condition: "clear".to_string(),
            temperature_c: 28.0,
            humidity_pct: 55,
            air_quality_index: 60,
            crowd_density: "medium".to_string(),
            light_level_lux: 20000,
            calamity_nearby: 0,
            area_risk_score: 15,
            sos_pressed: 0,
            last_checkin_min: 20,
            phone_battery_pct: 80,
            network_strength_dbm: -70,
            app_open_count_last_hr: 4,
            companion_count: 2,
            travel_mode: "walk".to_string(),
            booking_channel: "app".to_string(),
            trip_duration_days: 5,
            spend_per_day_usd: 120.0,
            trip_purpose: "leisure".to_string(),
        }
    }
}

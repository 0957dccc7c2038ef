//! Synthetic Dataset Generator
//!
//! Writes a labeled tourist telemetry CSV in the layout `train` expects,
//! mixing ordinary sightseeing snapshots with distressed ones.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tourist_anomaly_detector::{
    config::LoggingConfig,
    dataset::{dataset_headers, record_fields},
    logging::init_tracing,
    types::TouristRecord,
};
use tracing::info;

/// Generate a synthetic labeled tourist dataset
#[derive(Parser, Debug)]
#[command(name = "generate_dataset")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output CSV path
    #[arg(short, long, default_value = "tourist_full_dataset.csv")]
    output: PathBuf,

    /// Number of rows to generate
    #[arg(short = 'n', long, default_value = "2000")]
    rows: usize,

    /// Share of rows generated as distressed tourists
    #[arg(long, default_value = "0.1")]
    anomaly_rate: f64,

    /// RNG seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

/// Record generator for training data
struct TouristGenerator {
    rng: StdRng,
}

impl TouristGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// An ordinary sightseeing snapshot
    fn generate_normal(&mut self) -> TouristRecord {
        let time_of_day = self.random_choice(&["morning", "afternoon", "evening"]);
        let daylight = time_of_day != "evening";

        TouristRecord {
            latitude: self.rng.gen_range(27.10..27.25),
            longitude: self.rng.gen_range(77.95..78.10),
            altitude_m: self.rng.gen_range(160.0..200.0),
            time_stationary_hr: self.rng.gen_range(0.0..1.5),
            gps_shift_m: self.rng.gen_range(0.0..40.0),
            speed_kmph: self.rng.gen_range(2.0..6.0),
            avg_speed_last_30min: self.rng.gen_range(1.5..5.0),
            distance_from_city_center_km: self.rng.gen_range(0.0..5.0),
            geo_fence_violation: 0,
            altitude_change_m: self.rng.gen_range(0.0..15.0),
            time_of_day: time_of_day.to_string(),
            places_visited: self.rng.gen_range(1..8),
            heart_rate_bpm: self.rng.gen_range(65..100),
            blood_pressure_sys: self.rng.gen_range(110..135),
            blood_pressure_dia: self.rng.gen_range(70..88),
            oxygen_saturation_pct: self.rng.gen_range(96..100),
            skin_temperature_c: self.rng.gen_range(36.2..37.2),
            steps_last_hour: self.rng.gen_range(1000..4500),
            stress_index: self.rng.gen_range(10..40),
            hydration_level_pct: self.rng.gen_range(60..95),
            weather_condition: self.random_choice(&["clear", "cloudy", "rain"]).to_string(),
            temperature_c: self.rng.gen_range(18.0..34.0),
            humidity_pct: self.rng.gen_range(30..75),
            air_quality_index: self.rng.gen_range(30..110),
            crowd_density: self.random_choice(&["low", "medium", "high"]).to_string(),
            light_level_lux: if daylight {
                self.rng.gen_range(10_000..40_000)
            } else {
                self.rng.gen_range(50..800)
            },
            calamity_nearby: 0,
            area_risk_score: self.rng.gen_range(5..35),
            sos_pressed: 0,
            last_checkin_min: self.rng.gen_range(5..90),
            phone_battery_pct: self.rng.gen_range(35..100),
            network_strength_dbm: self.rng.gen_range(-85..-55),
            app_open_count_last_hr: self.rng.gen_range(1..10),
            companion_count: self.rng.gen_range(0..4),
            travel_mode: self.random_choice(&["walk", "taxi", "bus", "bike"]).to_string(),
            booking_channel: self.random_choice(&["app", "agent", "website"]).to_string(),
            trip_duration_days: self.rng.gen_range(2..14),
            spend_per_day_usd: self.rng.gen_range(40.0..250.0),
            trip_purpose: self
                .random_choice(&["leisure", "business", "pilgrimage"])
                .to_string(),
        }
    }

    /// A tourist in trouble: stranded, unwell, out of contact
    fn generate_distressed(&mut self) -> TouristRecord {
        let mut record = self.generate_normal();

        record.time_of_day = self.random_choice(&["night", "evening"]).to_string();
        record.time_stationary_hr = self.rng.gen_range(4.0..14.0);
        record.gps_shift_m = self.rng.gen_range(500.0..3000.0);
        record.speed_kmph = self.rng.gen_range(0.0..1.5);
        record.avg_speed_last_30min = self.rng.gen_range(0.0..1.0);
        record.distance_from_city_center_km = self.rng.gen_range(6.0..25.0);
        record.geo_fence_violation = 1;
        record.heart_rate_bpm = self.rng.gen_range(130..180);
        record.blood_pressure_sys = self.rng.gen_range(155..190);
        record.blood_pressure_dia = self.rng.gen_range(95..120);
        record.oxygen_saturation_pct = self.rng.gen_range(85..93);
        record.steps_last_hour = self.rng.gen_range(0..150);
        record.stress_index = self.rng.gen_range(70..100);
        record.weather_condition = self.random_choice(&["storm", "fog", "rain"]).to_string();
        record.light_level_lux = self.rng.gen_range(0..50);
        record.calamity_nearby = i64::from(self.rng.gen_bool(0.5));
        record.area_risk_score = self.rng.gen_range(55..95);
        record.sos_pressed = i64::from(self.rng.gen_bool(0.3));
        record.last_checkin_min = self.rng.gen_range(180..720);
        record.phone_battery_pct = self.rng.gen_range(2..30);
        record.network_strength_dbm = self.rng.gen_range(-115..-95);
        record.app_open_count_last_hr = self.rng.gen_range(0..2);
        record.companion_count = 0;
        record
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Accept only probabilities in [0, 1]; NaN fails the range check.
fn validate_rate(rate: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&rate) {
        bail!("anomaly rate must be within [0, 1], got {}", rate);
    }
    Ok(rate)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&LoggingConfig {
        level: "info".to_string(),
        format: "pretty".to_string(),
    })?;

    info!(
        output = %args.output.display(),
        rows = args.rows,
        anomaly_rate = args.anomaly_rate,
        seed = args.seed,
        "Generating synthetic dataset"
    );

    let anomaly_rate = validate_rate(args.anomaly_rate)?;
    let mut generator = TouristGenerator::new(args.seed);
    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    writer.write_record(dataset_headers())?;

    let start = Utc::now() - Duration::days(1);
    let mut anomalies = 0usize;

    for i in 0..args.rows {
        let distressed = generator.rng.gen_bool(anomaly_rate);
        let record = if distressed {
            anomalies += 1;
            generator.generate_distressed()
        } else {
            generator.generate_normal()
        };

        let timestamp = start + Duration::seconds(i as i64 * 30);
        let mut row = vec![format!("T{:05}", i + 1), timestamp.to_rfc3339()];
        row.extend(record_fields(&record)?);
        row.push(if distressed { "1" } else { "0" }.to_string());
        writer.write_record(&row)?;

        if (i + 1) % 500 == 0 {
            info!("Generated {}/{} rows ({} anomalies)", i + 1, args.rows, anomalies);
        }
    }
    writer.flush()?;

    info!(
        "Completed! Wrote {} rows ({} normal, {} anomalies)",
        args.rows,
        args.rows - anomalies,
        anomalies
    );
    Ok(())
}

use crate::error::ConfigError;
use chrono::NaiveTime;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

const START_AT_FORMAT: &str = "%H:%M:%S";

/// Custom Livox MID-40 capture: schedule spin-up, recording, spin-down, and conversion.
#[derive(Parser, Debug, Clone)]
#[command(name = "lidar-capture", version)]
pub struct Args {
    /// Clock time to begin capture (today or tomorrow if that time has passed).
    #[arg(long, value_name = "HH:MM:SS", conflicts_with = "delay")]
    pub start_at: Option<String>,

    /// Seconds to wait from now before starting capture [default: 0.0]
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub delay: Option<f64>,

    /// How long (seconds) to record once streaming starts.
    #[arg(long, value_name = "SECONDS", default_value_t = 5.0, allow_negative_numbers = true)]
    pub duration: f64,

    /// Base filename for the binary capture (and resulting .las).
    #[arg(long, value_name = "PATH", default_value = "capture.bin")]
    pub outfile: PathBuf,

    /// Keep the binary capture after a successful conversion.
    #[arg(long)]
    pub keep_bin: bool,

    /// Program used to talk to the sensor.
    #[arg(long, value_name = "PROGRAM", default_value = "livox-bridge")]
    pub sensor_bridge: PathBuf,

    /// Use a simulated sensor instead of the bridge.
    #[arg(long)]
    pub simulate: bool,

    /// Program converting the binary capture to LAS.
    #[arg(long, value_name = "PROGRAM", default_value = "livox-bin2las")]
    pub converter: PathBuf,

    /// How often to check whether the capture is done.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub poll_interval_ms: u64,

    /// Log specification, e.g. "info" or "lidar_capture=debug".
    #[arg(long, value_name = "SPEC", default_value = "info")]
    pub log_level: String,

    /// Write rotating log files to this directory instead of stderr.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScheduleMode {
    /// Next occurrence of a wall-clock time of day.
    At(NaiveTime),
    After(Duration),
    Immediately,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SensorBackend {
    Bridge(PathBuf),
    Simulated,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaptureConfig {
    pub schedule: ScheduleMode,
    pub duration: Duration,
    pub output: PathBuf,
    pub delete_bin: bool,
    pub poll_interval: Duration,
    pub sensor: SensorBackend,
    pub converter: PathBuf,
}

impl Args {
    pub fn resolve(&self) -> Result<CaptureConfig, ConfigError> {
        let schedule = match (&self.start_at, self.delay) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingSchedule),
            (Some(at), None) => ScheduleMode::At(parse_start_at(at)?),
            (None, Some(delay)) => {
                let delay = Duration::try_from_secs_f64(delay)
                    .map_err(|_| ConfigError::InvalidDelay(delay))?;
                if delay.is_zero() {
                    ScheduleMode::Immediately
                } else {
                    ScheduleMode::After(delay)
                }
            }
            (None, None) => ScheduleMode::Immediately,
        };

        let duration = Duration::try_from_secs_f64(self.duration)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(ConfigError::InvalidDuration(self.duration))?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        let sensor = if self.simulate {
            SensorBackend::Simulated
        } else {
            SensorBackend::Bridge(self.sensor_bridge.clone())
        };

        Ok(CaptureConfig {
            schedule,
            duration,
            output: self.outfile.clone(),
            delete_bin: !self.keep_bin,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            sensor,
            converter: self.converter.clone(),
        })
    }
}

pub fn parse_start_at(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, START_AT_FORMAT)
        .map_err(|_| ConfigError::InvalidStartAt(value.to_string()))
}

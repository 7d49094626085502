use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--start-at and --delay are mutually exclusive")]
    ConflictingSchedule,

    #[error("invalid --start-at {0:?}, expected HH:MM:SS")]
    InvalidStartAt(String),

    #[error("--delay must be a non-negative number of seconds, got {0}")]
    InvalidDelay(f64),

    #[error("--duration must be a positive number of seconds, got {0}")]
    InvalidDuration(f64),

    #[error("--poll-interval-ms must be greater than zero")]
    InvalidPollInterval,
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("could not run sensor bridge {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("sensor bridge `{command}` exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("sensor is not connected")]
    NotConnected,

    #[error("no stream is running")]
    NotStreaming,

    #[error("capture file error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("binary capture {0:?} does not exist")]
    MissingInput(PathBuf),

    #[error("could not run converter {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not remove stale output {path:?}: {source}")]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("converter exited with {0}")]
    Failed(ExitStatus),

    #[error("converter reported success but {0:?} was not written")]
    MissingOutput(PathBuf),

    #[error("could not remove binary capture: {0}")]
    Cleanup(#[source] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Config Error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not connect to a Livox sensor")]
    NoSensor,

    #[error("Connection Error: {0}")]
    Connection(#[source] SensorError),

    #[error("Streaming Error: {0}")]
    Streaming(#[source] SensorError),

    #[error("Device Error: {0}")]
    Device(#[source] SensorError),

    #[error("Conversion Error: {0}")]
    Conversion(#[from] ConvertError),

    #[error("capture cancelled")]
    Cancelled,
}

impl CaptureError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CaptureError::Config(_) => 2,
            CaptureError::NoSensor | CaptureError::Connection(_) => 3,
            CaptureError::Streaming(_) | CaptureError::Device(_) => 4,
            CaptureError::Conversion(_) => 5,
            CaptureError::Cancelled => 130,
        }
    }
}

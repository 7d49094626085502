use crate::config::SensorBackend;
use crate::error::SensorError;
use std::path::Path;
use std::time::Duration;

mod bridge;
#[cfg(test)]
pub mod recording;
mod simulated;

pub use bridge::BridgeSensor;
pub use simulated::SimulatedSensor;

/// Operations a Livox sensor exposes to the capture run.
pub trait LidarSensor {
    /// Finds a sensor and connects to it. `Ok(false)` means none answered.
    fn discover_and_connect(&mut self) -> Result<bool, SensorError>;
    fn spin_up(&mut self) -> Result<(), SensorError>;
    fn spin_down(&mut self) -> Result<(), SensorError>;
    fn start_realtime_binary_stream(&mut self) -> Result<(), SensorError>;
    /// Persists `duration` worth of the running stream to `path`, starting after `start_delay`.
    fn save_stream_to_file(
        &mut self,
        path: &Path,
        start_delay: Duration,
        duration: Duration,
    ) -> Result<(), SensorError>;
    fn is_capture_complete(&mut self) -> Result<bool, SensorError>;
    fn stop_stream(&mut self) -> Result<(), SensorError>;
    fn disconnect(&mut self) -> Result<(), SensorError>;
}

pub fn open(backend: &SensorBackend) -> Box<dyn LidarSensor> {
    match backend {
        SensorBackend::Bridge(program) => Box::new(BridgeSensor::new(program)),
        SensorBackend::Simulated => Box::new(SimulatedSensor::new()),
    }
}

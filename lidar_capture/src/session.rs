use crate::error::CaptureError;
use crate::sensor::LidarSensor;
use log::{info, warn};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Lifecycle {
    Connected,
    Spinning,
    Streaming,
    Released,
}

/// A connected sensor. Each stage consumes the session and hands it back on success;
/// whenever a session is dropped before `disconnect`, the device is torn down in reverse order.
pub struct DeviceSession {
    sensor: Box<dyn LidarSensor>,
    state: Lifecycle,
}

impl DeviceSession {
    pub fn connect(mut sensor: Box<dyn LidarSensor>) -> Result<Self, CaptureError> {
        match sensor.discover_and_connect() {
            Ok(true) => {
                info!("[ Sensor ] Connected");
                Ok(Self {
                    sensor,
                    state: Lifecycle::Connected,
                })
            }
            Ok(false) => Err(CaptureError::NoSensor),
            Err(e) => Err(CaptureError::Connection(e)),
        }
    }

    pub fn spin_up(mut self) -> Result<Self, CaptureError> {
        info!("[ Sensor ] Spinning up …");
        // a half-acknowledged spin-up still gets a spin-down
        self.state = Lifecycle::Spinning;
        self.sensor.spin_up().map_err(CaptureError::Device)?;
        Ok(self)
    }

    /// Starts the real-time binary stream and asks the sensor to save `duration` of it to `path`.
    pub fn start_streaming(mut self, path: &Path, duration: Duration) -> Result<Self, CaptureError> {
        info!("[ Capture ] Starting data stream …");
        self.state = Lifecycle::Streaming;
        self.sensor
            .start_realtime_binary_stream()
            .map_err(CaptureError::Streaming)?;
        self.sensor
            .save_stream_to_file(path, Duration::from_secs(0), duration)
            .map_err(CaptureError::Streaming)?;
        Ok(self)
    }

    pub fn is_capture_complete(&mut self) -> Result<bool, CaptureError> {
        self.sensor
            .is_capture_complete()
            .map_err(CaptureError::Streaming)
    }

    pub fn stop_streaming(mut self) -> Result<Self, CaptureError> {
        info!("[ Sensor ] Stopping stream & spinning down …");
        self.sensor.stop_stream().map_err(CaptureError::Streaming)?;
        self.state = Lifecycle::Spinning;
        Ok(self)
    }

    pub fn spin_down(mut self) -> Result<Self, CaptureError> {
        self.sensor.spin_down().map_err(CaptureError::Device)?;
        self.state = Lifecycle::Connected;
        Ok(self)
    }

    /// Releases whatever is still held, reporting the first failure.
    pub fn disconnect(mut self) -> Result<(), CaptureError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), CaptureError> {
        let mut first_error = None;
        if self.state == Lifecycle::Streaming {
            if let Err(e) = self.sensor.stop_stream() {
                warn!("[ Sensor ] Could not stop stream: {}", e);
                first_error.get_or_insert(CaptureError::Streaming(e));
            }
            self.state = Lifecycle::Spinning;
        }
        if self.state == Lifecycle::Spinning {
            if let Err(e) = self.sensor.spin_down() {
                warn!("[ Sensor ] Could not spin down: {}", e);
                first_error.get_or_insert(CaptureError::Device(e));
            }
            self.state = Lifecycle::Connected;
        }
        if self.state == Lifecycle::Connected {
            if let Err(e) = self.sensor.disconnect() {
                warn!("[ Sensor ] Could not disconnect: {}", e);
                first_error.get_or_insert(CaptureError::Device(e));
            }
            self.state = Lifecycle::Released;
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if self.state != Lifecycle::Released {
            warn!("[ Sensor ] Run ended early, tearing the sensor down");
            let _ = self.teardown();
        }
    }
}

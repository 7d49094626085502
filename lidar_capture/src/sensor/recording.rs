use super::LidarSensor;
use crate::error::SensorError;
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub type CallLog = Rc<RefCell<Vec<&'static str>>>;

/// Records every call it receives. `save` writes a small file so artifacts can be checked.
pub struct RecordingSensor {
    pub calls: CallLog,
    pub connects: bool,
    pub fail_on: Option<&'static str>,
    pub polls_until_complete: usize,
}

impl RecordingSensor {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            connects: true,
            fail_on: None,
            polls_until_complete: 3,
        }
    }

    pub fn failing_on(call: &'static str) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::new()
        }
    }

    fn record(&mut self, call: &'static str) -> Result<(), SensorError> {
        self.calls.borrow_mut().push(call);
        if self.fail_on == Some(call) {
            return Err(SensorError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("injected {} failure", call),
            )));
        }
        Ok(())
    }
}

impl LidarSensor for RecordingSensor {
    fn discover_and_connect(&mut self) -> Result<bool, SensorError> {
        self.record("connect")?;
        Ok(self.connects)
    }

    fn spin_up(&mut self) -> Result<(), SensorError> {
        self.record("spin_up")
    }

    fn spin_down(&mut self) -> Result<(), SensorError> {
        self.record("spin_down")
    }

    fn start_realtime_binary_stream(&mut self) -> Result<(), SensorError> {
        self.record("start_stream")
    }

    fn save_stream_to_file(
        &mut self,
        path: &Path,
        _start_delay: Duration,
        _duration: Duration,
    ) -> Result<(), SensorError> {
        self.record("save")?;
        fs::write(path, b"points")?;
        Ok(())
    }

    fn is_capture_complete(&mut self) -> Result<bool, SensorError> {
        if self.calls.borrow().last() != Some(&"poll") {
            self.calls.borrow_mut().push("poll");
        }
        if self.fail_on == Some("poll") {
            return Err(SensorError::NotStreaming);
        }
        if self.polls_until_complete == 0 {
            return Ok(true);
        }
        self.polls_until_complete -= 1;
        Ok(false)
    }

    fn stop_stream(&mut self) -> Result<(), SensorError> {
        self.record("stop_stream")
    }

    fn disconnect(&mut self) -> Result<(), SensorError> {
        self.record("disconnect")
    }
}

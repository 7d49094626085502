use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::scheduler;
use crate::sensor::LidarSensor;
use crate::session::DeviceSession;
use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, info};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub mod converter;

use converter::PointCloudConverter;

/// One full capture: connect, spin up, wait for the schedule, record, release the sensor, convert.
/// Returns the path of the LAS file.
pub fn run(
    config: &CaptureConfig,
    sensor: Box<dyn LidarSensor>,
    converter: &dyn PointCloudConverter,
    cancel: &Receiver<()>,
) -> Result<PathBuf, CaptureError> {
    let session = DeviceSession::connect(sensor)?.spin_up()?;

    scheduler::wait(config.schedule, cancel)?;

    let mut session = session.start_streaming(&config.output, config.duration)?;
    wait_for_capture(&mut session, config.poll_interval, cancel)?;

    session.stop_streaming()?.spin_down()?.disconnect()?;

    info!("[ Convert ] Converting to LAS …");
    let las = converter.convert(&config.output, config.delete_bin)?;
    info!("[ Done ] Output LAS: {}", las.display());
    Ok(las)
}

/// Polls the sensor until it reports the capture finished.
pub fn wait_for_capture(
    session: &mut DeviceSession,
    poll_interval: Duration,
    cancel: &Receiver<()>,
) -> Result<(), CaptureError> {
    let started = Instant::now();
    loop {
        if session.is_capture_complete()? {
            debug!("Capture complete after {:.1}s", started.elapsed().as_secs_f64());
            return Ok(());
        }
        match cancel.try_recv() {
            Ok(()) => return Err(CaptureError::Cancelled),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }
        std::thread::sleep(poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::converter::las_path;
    use super::*;
    use crate::config::{ScheduleMode, SensorBackend};
    use crate::error::ConvertError;
    use crate::sensor::recording::{CallLog, RecordingSensor};
    use crate::sensor::SimulatedSensor;
    use crossbeam_channel::bounded;
    use std::fs;
    use std::io;
    use std::path::Path;

    struct FakeConverter {
        calls: CallLog,
        fails: bool,
    }

    impl PointCloudConverter for FakeConverter {
        fn convert(&self, bin: &Path, delete_source: bool) -> Result<PathBuf, ConvertError> {
            self.calls.borrow_mut().push(if delete_source {
                "convert(delete)"
            } else {
                "convert(keep)"
            });
            if self.fails {
                return Err(ConvertError::Cleanup(io::Error::new(
                    io::ErrorKind::Other,
                    "converter failed",
                )));
            }
            let las = las_path(bin);
            fs::copy(bin, &las).map_err(ConvertError::Cleanup)?;
            if delete_source {
                fs::remove_file(bin).map_err(ConvertError::Cleanup)?;
            }
            Ok(las)
        }
    }

    fn config(dir: &Path) -> CaptureConfig {
        CaptureConfig {
            schedule: ScheduleMode::Immediately,
            duration: Duration::from_secs(2),
            output: dir.join("test.bin"),
            delete_bin: true,
            poll_interval: Duration::from_millis(1),
            sensor: SensorBackend::Simulated,
            converter: PathBuf::from("unused"),
        }
    }

    fn converter_for(sensor: &RecordingSensor, fails: bool) -> FakeConverter {
        FakeConverter {
            calls: sensor.calls.clone(),
            fails,
        }
    }

    #[test]
    fn connect_failure_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut sensor = RecordingSensor::new();
        sensor.connects = false;
        let calls = sensor.calls.clone();
        let converter = converter_for(&sensor, false);
        let (_tx, rx) = bounded(1);

        let result = run(&config, Box::new(sensor), &converter, &rx);

        assert!(matches!(result, Err(CaptureError::NoSensor)));
        assert_eq!(*calls.borrow(), vec!["connect"]);
        assert!(!config.output.exists());
    }

    #[test]
    fn successful_run_calls_everything_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let sensor = RecordingSensor::new();
        let calls = sensor.calls.clone();
        let converter = converter_for(&sensor, false);
        let (_tx, rx) = bounded(1);

        let las = run(&config, Box::new(sensor), &converter, &rx).unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![
                "connect",
                "spin_up",
                "start_stream",
                "save",
                "poll",
                "stop_stream",
                "spin_down",
                "disconnect",
                "convert(delete)"
            ]
        );
        assert_eq!(las, dir.path().join("test.bin.las"));
        assert!(las.exists());
        assert!(!config.output.exists());
    }

    #[test]
    fn keep_bin_is_passed_to_the_converter() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.delete_bin = false;
        let sensor = RecordingSensor::new();
        let calls = sensor.calls.clone();
        let converter = converter_for(&sensor, false);
        let (_tx, rx) = bounded(1);

        run(&config, Box::new(sensor), &converter, &rx).unwrap();

        assert_eq!(calls.borrow().last(), Some(&"convert(keep)"));
        assert!(config.output.exists());
    }

    #[test]
    fn conversion_failure_keeps_the_binary() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let sensor = RecordingSensor::new();
        let converter = converter_for(&sensor, true);
        let (_tx, rx) = bounded(1);

        let err = run(&config, Box::new(sensor), &converter, &rx).unwrap_err();

        assert!(matches!(err, CaptureError::Conversion(_)));
        assert_ne!(err.exit_code(), 0);
        assert!(config.output.exists());
    }

    #[test]
    fn streaming_failure_tears_down_without_converting() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let sensor = RecordingSensor::failing_on("poll");
        let calls = sensor.calls.clone();
        let converter = converter_for(&sensor, false);
        let (_tx, rx) = bounded(1);

        let err = run(&config, Box::new(sensor), &converter, &rx).unwrap_err();

        assert!(matches!(err, CaptureError::Streaming(_)));
        assert_eq!(
            *calls.borrow(),
            vec![
                "connect",
                "spin_up",
                "start_stream",
                "save",
                "poll",
                "stop_stream",
                "spin_down",
                "disconnect"
            ]
        );
    }

    #[test]
    fn cancel_during_the_wait_spins_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.schedule = ScheduleMode::After(Duration::from_secs(3600));
        let sensor = RecordingSensor::new();
        let calls = sensor.calls.clone();
        let converter = converter_for(&sensor, false);
        let (tx, rx) = bounded(1);
        tx.send(()).unwrap();

        let err = run(&config, Box::new(sensor), &converter, &rx).unwrap_err();

        assert!(matches!(err, CaptureError::Cancelled));
        assert_eq!(
            *calls.borrow(),
            vec!["connect", "spin_up", "spin_down", "disconnect"]
        );
        assert!(!config.output.exists());
    }

    #[test]
    fn cancel_during_capture_stops_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut sensor = RecordingSensor::new();
        sensor.polls_until_complete = usize::MAX;
        let calls = sensor.calls.clone();
        let converter = converter_for(&sensor, false);
        let (tx, rx) = bounded(1);
        tx.send(()).unwrap();

        let err = run(&config, Box::new(sensor), &converter, &rx).unwrap_err();

        assert!(matches!(err, CaptureError::Cancelled));
        assert_eq!(
            &calls.borrow()[4..],
            &["poll", "stop_stream", "spin_down", "disconnect"]
        );
    }

    #[test]
    fn simulated_sensor_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.duration = Duration::from_millis(50);
        let converter = FakeConverter {
            calls: Default::default(),
            fails: false,
        };
        let (_tx, rx) = bounded(1);

        let las = run(&config, Box::new(SimulatedSensor::new()), &converter, &rx).unwrap();

        assert!(fs::metadata(&las).unwrap().len() > 0);
        assert!(!config.output.exists());
    }
}

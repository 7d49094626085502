use super::LidarSensor;
use crate::error::SensorError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POINTS_PER_BATCH: usize = 100;
const BATCH_PERIOD: Duration = Duration::from_millis(10);
/// x, y, z as little endian f32 followed by one intensity byte.
pub const RECORD_SIZE: usize = 13;

enum SaveMessage {
    Done(io::Result<u64>),
}

/// In-process stand-in for a MID-40: writes synthetic point records on a worker thread.
#[derive(Default)]
pub struct SimulatedSensor {
    connected: bool,
    spinning: bool,
    streaming: bool,
    complete: bool,
    save_thread: Option<JoinHandle<()>>,
    done: Option<Receiver<SaveMessage>>,
    stop: Option<Sender<()>>,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    fn join_saver(&mut self) {
        self.stop = None;
        if let Some(handle) = self.save_thread.take() {
            let _ = handle.join();
        }
    }
}

impl LidarSensor for SimulatedSensor {
    fn discover_and_connect(&mut self) -> Result<bool, SensorError> {
        info!("Simulated sensor connected");
        self.connected = true;
        Ok(true)
    }

    fn spin_up(&mut self) -> Result<(), SensorError> {
        if !self.connected {
            return Err(SensorError::NotConnected);
        }
        self.spinning = true;
        Ok(())
    }

    fn spin_down(&mut self) -> Result<(), SensorError> {
        self.spinning = false;
        Ok(())
    }

    fn start_realtime_binary_stream(&mut self) -> Result<(), SensorError> {
        if !self.connected {
            return Err(SensorError::NotConnected);
        }
        if !self.spinning {
            warn!("Streaming from a sensor that is not spinning");
        }
        self.streaming = true;
        Ok(())
    }

    fn save_stream_to_file(
        &mut self,
        path: &Path,
        start_delay: Duration,
        duration: Duration,
    ) -> Result<(), SensorError> {
        if !self.streaming {
            return Err(SensorError::NotStreaming);
        }
        self.join_saver();
        let file = File::create(path)?;
        let (done_tx, done_rx) = bounded::<SaveMessage>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let path = path.to_path_buf();
        self.complete = false;
        self.done = Some(done_rx);
        self.stop = Some(stop_tx);
        self.save_thread = Some(std::thread::spawn(move || {
            let result = write_points(file, start_delay, duration, &stop_rx);
            debug!("Simulated save to {:?} finished: {:?}", path, result);
            let _ = done_tx.send(SaveMessage::Done(result));
        }));
        Ok(())
    }

    fn is_capture_complete(&mut self) -> Result<bool, SensorError> {
        if self.complete {
            return Ok(true);
        }
        let done = self.done.as_ref().ok_or(SensorError::NotStreaming)?;
        match done.try_recv() {
            Ok(SaveMessage::Done(Ok(_))) => {
                self.complete = true;
                Ok(true)
            }
            Ok(SaveMessage::Done(Err(e))) => Err(e.into()),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(SensorError::NotStreaming),
        }
    }

    fn stop_stream(&mut self) -> Result<(), SensorError> {
        self.join_saver();
        self.streaming = false;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SensorError> {
        self.connected = false;
        Ok(())
    }
}

impl Drop for SimulatedSensor {
    fn drop(&mut self) {
        self.join_saver();
    }
}

fn write_points(
    file: File,
    start_delay: Duration,
    duration: Duration,
    stop: &Receiver<()>,
) -> io::Result<u64> {
    let mut out = BufWriter::new(file);
    // a message or a hang-up both mean stop
    if !matches!(stop.recv_timeout(start_delay), Err(RecvTimeoutError::Timeout)) {
        return Ok(0);
    }
    let started = Instant::now();
    let mut written = 0u64;
    let mut n = 0usize;
    while started.elapsed() < duration {
        for _ in 0..POINTS_PER_BATCH {
            out.write_all(&synthetic_point(n))?;
            n += 1;
            written += RECORD_SIZE as u64;
        }
        if !matches!(stop.recv_timeout(BATCH_PERIOD), Err(RecvTimeoutError::Timeout)) {
            break;
        }
    }
    out.flush()?;
    Ok(written)
}

/// Rosette-like scan pattern, a few meters in front of the sensor.
fn synthetic_point(n: usize) -> [u8; RECORD_SIZE] {
    let t = n as f32 * 0.01;
    let r = (t * 7.0).sin() * 0.4;
    let x = 5.0 + (t * 0.5).sin();
    let y = r * t.cos();
    let z = r * t.sin();
    let mut record = [0u8; RECORD_SIZE];
    record[0..4].copy_from_slice(&x.to_le_bytes());
    record[4..8].copy_from_slice(&y.to_le_bytes());
    record[8..12].copy_from_slice(&z.to_le_bytes());
    record[12] = (n % 256) as u8;
    record
}

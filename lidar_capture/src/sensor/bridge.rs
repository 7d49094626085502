use super::LidarSensor;
use crate::error::SensorError;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

/// Talks to the sensor through an external bridge program, one subcommand per operation.
/// The `save` subcommand stays alive as a child process for the length of the capture.
#[derive(Debug)]
pub struct BridgeSensor {
    program: PathBuf,
    saver: Option<Child>,
}

impl BridgeSensor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            saver: None,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null());
        command
    }

    fn status(&self, args: &[&str]) -> Result<ExitStatus, SensorError> {
        debug!("Running {:?} {}", self.program, args.join(" "));
        self.command(args)
            .status()
            .map_err(|source| SensorError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    fn run(&self, args: &[&str]) -> Result<(), SensorError> {
        let status = self.status(args)?;
        if !status.success() {
            return Err(SensorError::CommandFailed {
                command: args.join(" "),
                status,
            });
        }
        Ok(())
    }

    fn kill_saver(&mut self) {
        if let Some(mut child) = self.saver.take() {
            if let Ok(None) = child.try_wait() {
                warn!("Save process {} still running, killing it", child.id());
                if let Err(e) = child.kill() {
                    warn!("Could not kill save process: {}", e);
                }
            }
            let _ = child.wait();
        }
    }
}

impl LidarSensor for BridgeSensor {
    fn discover_and_connect(&mut self) -> Result<bool, SensorError> {
        Ok(self.status(&["discover"])?.success())
    }

    fn spin_up(&mut self) -> Result<(), SensorError> {
        self.run(&["spin-up"])
    }

    fn spin_down(&mut self) -> Result<(), SensorError> {
        self.run(&["spin-down"])
    }

    fn start_realtime_binary_stream(&mut self) -> Result<(), SensorError> {
        self.run(&["start-stream"])
    }

    fn save_stream_to_file(
        &mut self,
        path: &Path,
        start_delay: Duration,
        duration: Duration,
    ) -> Result<(), SensorError> {
        self.kill_saver();
        let output = path.to_string_lossy();
        let delay = format!("{}", start_delay.as_secs_f64());
        let length = format!("{}", duration.as_secs_f64());
        let args: [&str; 7] = [
            "save",
            "--output",
            &*output,
            "--delay",
            &delay,
            "--duration",
            &length,
        ];
        debug!("Spawning {:?} {}", self.program, args.join(" "));
        let child = self
            .command(&args)
            .spawn()
            .map_err(|source| SensorError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        debug!("Save process started with pid {}", child.id());
        self.saver = Some(child);
        Ok(())
    }

    fn is_capture_complete(&mut self) -> Result<bool, SensorError> {
        let child = self.saver.as_mut().ok_or(SensorError::NotStreaming)?;
        match child.try_wait()? {
            None => Ok(false),
            Some(status) if status.success() => Ok(true),
            Some(status) => Err(SensorError::CommandFailed {
                command: "save".to_string(),
                status,
            }),
        }
    }

    fn stop_stream(&mut self) -> Result<(), SensorError> {
        self.kill_saver();
        self.run(&["stop-stream"])
    }

    fn disconnect(&mut self) -> Result<(), SensorError> {
        self.run(&["disconnect"])
    }
}

impl Drop for BridgeSensor {
    fn drop(&mut self) {
        self.kill_saver();
    }
}

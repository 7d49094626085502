use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

mod capture;
mod config;
mod error;
mod logging;
mod scheduler;
mod sensor;
mod session;

use capture::converter::CommandConverter;
use config::Args;
use error::CaptureError;

fn main() {
    let args = Args::parse();
    let _logger = match logging::init(&args.log_level, args.log_dir.as_deref()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Could not start logger: {}", e);
            std::process::exit(1);
        }
    };
    info!("Starting up...");
    let code = match run(&args) {
        Ok(las) => {
            println!("{}", las.display());
            0
        }
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    };
    log::logger().flush();
    std::process::exit(code);
}

fn run(args: &Args) -> Result<PathBuf, CaptureError> {
    let config = args.resolve()?;
    let cancel = interrupt_channel();
    let sensor = sensor::open(&config.sensor);
    let converter = CommandConverter::new(&config.converter);
    capture::run(&config, sensor, &converter, &cancel)
}

#[derive(Debug, PartialEq)]
enum Interrupt {
    Cancel,
    Abort,
}

/// The first interrupt cancels the run, any later one gives up on teardown.
fn on_interrupt(count: &AtomicUsize, sender: &Sender<()>) -> Interrupt {
    if count.fetch_add(1, Ordering::SeqCst) == 0 {
        let _ = sender.try_send(());
        Interrupt::Cancel
    } else {
        Interrupt::Abort
    }
}

/// Ctrl-C and SIGTERM land on the returned channel so the run can release the sensor first.
fn interrupt_channel() -> Receiver<()> {
    let (sender, receiver) = crossbeam_channel::bounded::<()>(1);
    let count = AtomicUsize::new(0);
    if let Err(e) = ctrlc::set_handler(move || match on_interrupt(&count, &sender) {
        Interrupt::Cancel => warn!("Interrupted, releasing the sensor..."),
        Interrupt::Abort => {
            error!("Interrupted again, exiting without releasing the sensor");
            log::logger().flush();
            std::process::exit(CaptureError::Cancelled.exit_code());
        }
    }) {
        warn!("Could not install interrupt handler: {}", e);
    }
    receiver
}

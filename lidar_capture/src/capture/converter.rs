use crate::error::ConvertError;
use log::{debug, info, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const LAS_EXTENSION: &str = "las";

pub trait PointCloudConverter {
    /// Converts `bin` to LAS, removing `bin` afterwards if asked and the conversion succeeded.
    fn convert(&self, bin: &Path, delete_source: bool) -> Result<PathBuf, ConvertError>;
}

/// `capture.bin` becomes `capture.bin.las`.
pub fn las_path(bin: &Path) -> PathBuf {
    let mut name = OsString::from(bin.as_os_str());
    name.push(".");
    name.push(LAS_EXTENSION);
    PathBuf::from(name)
}

/// Runs `PROGRAM BIN LAS` and waits for it.
#[derive(Clone, Debug)]
pub struct CommandConverter {
    program: PathBuf,
}

impl CommandConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PointCloudConverter for CommandConverter {
    fn convert(&self, bin: &Path, delete_source: bool) -> Result<PathBuf, ConvertError> {
        if !bin.is_file() {
            return Err(ConvertError::MissingInput(bin.to_path_buf()));
        }
        let las = las_path(bin);
        if las.exists() {
            warn!("Removing stale {:?} from an earlier run", las);
            fs::remove_file(&las).map_err(|source| ConvertError::StaleOutput {
                path: las.clone(),
                source,
            })?;
        }
        debug!("Running {:?} {:?} {:?}", self.program, bin, las);
        let mut process = Command::new(&self.program)
            .arg(bin)
            .arg(&las)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        info!("Started conversion process {}", process.id());
        let status = process.wait().map_err(|source| ConvertError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if !status.success() {
            warn!("Conversion failed, keeping {:?}", bin);
            return Err(ConvertError::Failed(status));
        }
        if !las.is_file() {
            return Err(ConvertError::MissingOutput(las));
        }
        if delete_source {
            fs::remove_file(bin).map_err(ConvertError::Cleanup)?;
            debug!("Removed {:?}", bin);
        }
        Ok(las)
    }
}

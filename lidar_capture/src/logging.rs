use flexi_logger::{
    colored_opt_format, Cleanup, Criterion, Duplicate, FlexiLoggerError, Logger, Naming,
    ReconfigurationHandle,
};
use std::path::Path;

/// Logs to stderr, or to rotating files in `dir` with warnings still shown on stderr.
pub fn init(spec: &str, dir: Option<&Path>) -> Result<ReconfigurationHandle, FlexiLoggerError> {
    let logger = Logger::with_str(spec).format(colored_opt_format);
    let logger = match dir {
        Some(dir) => logger
            .log_to_file()
            .directory(dir)
            .rotate(
                Criterion::Size(500_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(2),
            )
            .duplicate_to_stderr(Duplicate::Warn),
        None => logger,
    };
    let handle = logger.start()?;
    log_panics::init();
    Ok(handle)
}

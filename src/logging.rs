use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "calendar-board";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const LOG_ENV_VAR: &str = "CALBOARD_LOG";

/// Log files live next to the task and settings slots.
pub fn log_directory(data_dir: &Path) -> &Path {
    data_dir
}

/// Picks the log spec: `CALBOARD_LOG`, then `RUST_LOG`, then the build default.
pub fn log_spec(board_log: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,calendar_board_lib=debug,calendar_board=debug"
    } else {
        "warn,calendar_board_lib=info,calendar_board=info"
    };
    board_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(data_dir: &Path) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(data_dir)?;

    let spec = log_spec(
        std::env::var(LOG_ENV_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
    );

    Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(log_directory(data_dir))
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        // Warnings also reach the terminal; stdout carries command output.
        .duplicate_to_stderr(Duplicate::Warn)
        .start()?;

    install_panic_hook(data_dir);

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        log_directory(data_dir).display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(())
}

/// One-line panic summary written to the board log before the default hook runs.
pub fn panic_report(data_dir: &Path, payload: Option<&str>, location: Option<String>) -> String {
    format!(
        "board panicked data_dir={} payload={} location={}",
        data_dir.display(),
        payload.unwrap_or("<non-string panic payload>"),
        location.as_deref().unwrap_or("<unknown>")
    )
}

#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook(data_dir: &Path) {
    let data_dir = data_dir.to_path_buf();
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str));
        let location = info.location().map(|loc| loc.to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();

        log::error!(
            "{}\nbacktrace:\n{backtrace}",
            panic_report(&data_dir, payload, location)
        );
        default_hook(info);
    }));
}

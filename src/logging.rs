//! Sets up the fern logging dispatch for the application.
use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::path::Path;

/// Initializes the global logger.
///
/// The verbosity maps to the `-v` occurrences on the command line, everything
/// above warnings is opt-in. When `logoutput` is set to a path, log records are
/// written to that file instead of stdout ("-" selects stdout explicitly).
pub fn init(verbosity: u8, logoutput: Option<&Path>) -> Result<()> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::BrightBlue)
        .trace(Color::Magenta);

    let dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level);

    let dispatch = match logoutput {
        None => dispatch.chain(std::io::stdout()),
        Some(path) if path == Path::new("-") => dispatch.chain(std::io::stdout()),
        Some(path) => dispatch.chain(
            fern::log_file(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?,
        ),
    };

    dispatch.apply().context("Failed to set up logging")?;

    Ok(())
}

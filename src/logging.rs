//! Logger setup for the `spv` binary
//!
//! The library only emits records through `log`; installing a logger is the
//! embedder's call. `RUST_LOG` wins over the verbosity flags when set.

use env_logger::fmt::{Color, Formatter};
use log::{Level, LevelFilter, Record};
use std::io::Write;

/// Map `-q`/`-v` counts to a filter for this crate.
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the stderr logger. Calling it twice is a no-op.
pub fn setup_logger(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter(None, LevelFilter::Off);
        builder.filter(Some("sprite_variants"), level);
        builder.filter(Some("spv"), level);
    }

    builder.format(|buf: &mut Formatter, record: &Record| {
        let module_info = match (record.module_path(), record.line()) {
            (Some(module), Some(line)) => format!("{module}:{line}"),
            (Some(module), None) => module.to_string(),
            _ => "unknown".to_string(),
        };

        let mut level_style = buf.style();
        match record.level() {
            Level::Error => level_style.set_color(Color::Red).set_bold(true),
            Level::Warn => level_style.set_color(Color::Yellow).set_bold(true),
            Level::Info => level_style.set_color(Color::Green).set_bold(true),
            Level::Debug => level_style.set_color(Color::Blue).set_bold(true),
            Level::Trace => level_style.set_color(Color::White),
        };
        let mut meta_style = buf.style();
        meta_style.set_color(Color::Rgb(120, 120, 120));

        writeln!(
            buf,
            "{} {} {}",
            level_style.value(record.level()),
            meta_style.value(module_info),
            record.args()
        )
    });

    if builder.try_init().is_err() {
        log::debug!("logger already installed");
    }
}

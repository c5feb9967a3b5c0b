use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// Log to stderr with colored levels. Other crates are capped at `Info`.
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {} [{}] {}",
                humantime::format_rfc3339_seconds(std::time::SystemTime::now()),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level.min(LevelFilter::Info))
        .level_for(env!("CARGO_CRATE_NAME"), level)
        .chain(std::io::stderr())
        .apply()
}

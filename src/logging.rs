//! Logging setup: colored level prefixes, an optional date/time stamp, and verbosity driven by
//! repeated `-v` flags rather than a separate `RUST_LOG` dance (though `RUST_LOG` still wins if
//! set, matching `env_logger`'s usual precedence).

use env_logger::fmt::Color;
use env_logger::Env;
use log::LevelFilter;
use std::io::Write;

/// Initializes the global logger. `verbose_count` maps 0→Info, 1→Debug, 2+→Trace, mirroring the
/// repeatable `--verbose` flag.
pub fn init(verbose_count: u8, no_datetime_log: bool) {
    let default_level = match verbose_count {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));

    builder.format(move |buf, record| {
        let level_color = match record.level() {
            log::Level::Error => Color::Red,
            log::Level::Warn => Color::Yellow,
            log::Level::Info => Color::Green,
            log::Level::Debug => Color::Cyan,
            log::Level::Trace => Color::Black,
        };
        let level_style = buf.style().set_color(level_color).clone();

        if no_datetime_log {
            writeln!(buf, "{:5} | {}", level_style.value(record.level()), record.args())
        } else {
            writeln!(buf, "{} {:5} | {}", buf.timestamp_millis(), level_style.value(record.level()), record.args())
        }
    });

    builder.init();
}

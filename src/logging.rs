use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::path::Path;
use std::str::FromStr;

/// Parse a level name such as "warn" or "DEBUG". `None` for anything else.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(name.trim()).ok()
}

/// Install the global logger.
///
/// With a `file`, log records are appended to it; otherwise they go to stderr.
/// Best-effort: a file that cannot be opened falls back to stderr, and a logger that
/// is already installed is left alone.
pub fn init(level: LevelFilter, file: Option<&Path>) {
    if let Some(path) = file {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(f) => {
                let _ = WriteLogger::init(level, Config::default(), f);
                return;
            }
            Err(e) => eprintln!("tinsh: cannot open log file {}: {e}", path.display()),
        }
    }
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_levels() {
        assert_eq!(parse_level("warn"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("DEBUG"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" trace "), Some(LevelFilter::Trace));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
    }

    #[test]
    fn parse_unknown_level() {
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level(""), None);
    }
}

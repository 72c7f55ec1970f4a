use argh::FromArgs;
use std::path::PathBuf;
use tinsh::{Environment, Interpreter, ShellConfig, logging};

#[derive(FromArgs)]
/// A tiny interactive command shell.
struct Args {
    /// run a single command line and exit with its status.
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// configuration file merged over the defaults (default: ~/.config/tinsh/config.toml).
    #[argh(option)]
    config: Option<PathBuf>,

    /// log level: off, error, warn, info, debug or trace.
    #[argh(option)]
    log_level: Option<String>,
}

fn main() {
    let args: Args = argh::from_env();
    std::process::exit(run(args));
}

fn run(args: Args) -> i32 {
    let config = match ShellConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tinsh: {e:#}");
            return 2;
        }
    };

    let level_name = args.log_level.as_deref().unwrap_or(&config.logging.level);
    let level = logging::parse_level(level_name).unwrap_or_else(|| {
        eprintln!("tinsh: unknown log level {level_name:?}, using warn");
        log::LevelFilter::Warn
    });
    let env = Environment::new();
    let log_file = (!config.logging.file.is_empty())
        .then(|| tinsh::config::expand_path(&config.logging.file, &env.home()));
    logging::init(level, log_file.as_deref());

    let mut shell = Interpreter::new(config, env);
    match args.command {
        Some(line) => shell.run_line(&line, &mut std::io::stdout(), &mut std::io::stderr()),
        None => match shell.repl() {
            Ok(code) => code,
            Err(e) => {
                eprintln!("tinsh: {e:#}");
                1
            }
        },
    }
}

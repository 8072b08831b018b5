//! Log setup. The terminal belongs to the TUI, so records either go to a
//! file or, when `RUST_LOG` is set and no file is given, to stderr.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

pub fn init(log_file: Option<&Path>) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None if std::env::var_os("RUST_LOG").is_some() => {
            builder.target(Target::Stderr);
        }
        None => {
            builder.filter_level(LevelFilter::Off);
        }
    }

    // A second init (tests, embedding) keeps the first logger.
    if builder.try_init().is_err() {
        log::debug!("logger already initialised");
    }
    Ok(())
}

mod commands;
mod config;
mod fetch;
mod keybindings;
mod shell;

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use board_core::{ClockEngine, DirBlobStore, FileDescriptorStore, Reconciler, Session};
use tracing_subscriber::EnvFilter;

use config::Config;
use shell::{Clock, Shell};

const USAGE: &str = "usage: board [--data-dir DIR] [--memory]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    data_dir: Option<PathBuf>,
    memory: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<Self>> {
        let mut parsed = Args::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data-dir" => {
                    let dir = args.next().context("--data-dir needs a directory")?;
                    parsed.data_dir = Some(PathBuf::from(dir));
                }
                "--memory" => parsed.memory = true,
                "-h" | "--help" => return Ok(None),
                other => bail!("unexpected argument '{other}'\n{USAGE}"),
            }
        }
        Ok(Some(parsed))
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_stores(args: &Args, config: &Config) -> anyhow::Result<Reconciler> {
    if args.memory {
        tracing::info!("running without persistence");
        return Ok(Reconciler::in_memory());
    }

    let dir = args
        .data_dir
        .clone()
        .or_else(|| config.data_dir())
        .context("no data directory available, pass --data-dir or --memory")?;
    let blobs = DirBlobStore::open(dir.join("blobs"))
        .with_context(|| format!("opening blob store in {}", dir.display()))?;
    let descriptors = FileDescriptorStore::new(
        dir.join(config.descriptor_file_name()),
        config.descriptor_format,
    );
    tracing::info!(dir = %dir.display(), "using data directory");
    Ok(Reconciler::new(blobs, descriptors))
}

fn main() -> anyhow::Result<()> {
    let Some(args) = Args::parse(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };

    let config = Config::load();
    init_tracing(&config);

    let reconciler = open_stores(&args, &config)?;
    let engine = ClockEngine::new();
    let (session, report) = Session::hydrate(engine.clone(), reconciler);

    if let Some(error) = &report.descriptor_error {
        println!("warning: saved session unreadable, starting fresh ({error})");
    }
    for gap in &report.gaps {
        println!(
            "warning: could not restore '{}' in {} ({:?})",
            gap.name, gap.tab, gap.reason
        );
    }
    println!(
        "{} tabs, {} sounds. Type 'help' for commands.",
        report.restored_tabs, report.restored_sounds
    );

    let mut shell = Shell::new(session, engine, &config, Clock::Wall(Instant::now()));
    shell.run(io::stdin().lock(), &mut io::stdout())?;
    shell.into_session().teardown();
    config.save();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> anyhow::Result<Option<Args>> {
        Args::parse(words.iter().map(|w| w.to_string()))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(args(&[]).expect("parse"), Some(Args::default()));
        assert_eq!(
            args(&["--data-dir", "/tmp/board", "--memory"]).expect("parse"),
            Some(Args {
                data_dir: Some(PathBuf::from("/tmp/board")),
                memory: true,
            })
        );
        assert_eq!(args(&["--help"]).expect("parse"), None);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&["--data-dir"]).is_err());
        assert!(args(&["--loud"]).is_err());
    }
}

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use padkeys::config::{parse_level, AppConfig};
use padkeys::console::Console;
use padkeys::session::DeviceRegistry;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "padkeys",
    about = "Drive USB gamepad sessions from a console script and print the keys they produce."
)]
struct Args {
    /// Configuration file (defaults to <config dir>/padkeys/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level, overrides the configured one
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Console script to run instead of reading stdin
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup()?;

    let config = match args.config.clone().or_else(AppConfig::default_path) {
        Some(path) => AppConfig::load_or_default(&path)?,
        None => AppConfig::default(),
    };
    let level = match &args.log_level {
        Some(level) => parse_level(level)?,
        None => config.logging.max_level()?,
    };
    setup_logging_env(level);

    info!("Initializing registry with configured bindings");
    let mappings = config.mapping_tables()?;
    debug!("Applied {} binding(s)", config.bindings.len());
    let mut console = Console::new(DeviceRegistry::new(config.registry_settings(), mappings));

    let input: Box<dyn AsyncBufRead + Unpin> = match &args.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| eyre!("Failed to open script {}: {}", path.display(), e))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut lines = input.lines();
    let mut line_number = 0usize;
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| eyre!("Failed to read console input: {}", e))?
    {
        line_number += 1;
        match console.execute(&line) {
            Ok(output) => output.iter().for_each(|out| println!("{out}")),
            Err(e) => {
                warn!("line {}: {}", line_number, e);
                println!("error: {e}");
            }
        }
    }

    console.shutdown();
    info!("Console input closed after {} line(s)", line_number);
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();
}

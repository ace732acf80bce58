mod app;
mod config;
mod games;
mod input;
mod model;
mod profile;
mod registry;
mod render;
mod schedule;
mod server;
mod session;
mod sim;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{load_settings, project_paths, resolve_paths, save_settings_atomic, Paths, Settings};
use registry::BackendKind;
use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pixelgotchi", version)]
#[command(about = "A tiny pixel pet for the terminal, with a shared name registry over HTTP")]
struct Cli {
    /// Settings file (default: settings.json in the project data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry backend
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendKind>,

    /// Directory for the registry, session and log files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seed for the mini-game randomness
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the pet-name and registry endpoints
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Play in the terminal (default)
    Play,
    /// Print the effective settings
    Config {
        /// Also write them back to the settings file
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

impl Cli {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if let Some(dir) = &self.data_dir {
            settings.data_dir = Some(dir.clone());
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(Command::Serve { bind: Some(addr) }) = &self.command {
            settings.bind_addr = *addr;
        }
    }
}

fn logger() -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
}

/// The terminal owns stdout/stderr while playing, so logs go to a file.
fn init_file_logger(paths: &Paths) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
        .with_context(|| format!("could not open {}", paths.log_path.display()))?;
    logger()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.as_ref().unwrap_or(&Command::Play);
    if !matches!(command, Command::Play) {
        logger().init();
    }

    let base = project_paths()?;
    let settings_path = cli.config.clone().unwrap_or_else(|| base.settings_path.clone());
    let mut settings = load_settings(&settings_path);
    cli.apply_overrides(&mut settings);
    let paths = resolve_paths(base, &settings)?;

    match command {
        Command::Serve { .. } => {
            let store = registry::open(settings.backend, &paths.data_dir);
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("could not start the async runtime")?;
            rt.block_on(server::serve(settings, store))
        }
        Command::Play => {
            init_file_logger(&paths)?;
            let store = registry::open(settings.backend, &paths.data_dir);
            app::run(&settings, &paths, store)
        }
        Command::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if *save {
                save_settings_atomic(&settings_path, &settings)?;
                log::info!("wrote {}", settings_path.display());
            }
            Ok(())
        }
    }
}

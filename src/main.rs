mod launcher;

use std::{error::Error, fs::File, path::PathBuf};

use clap::Parser;
use env_logger::{Env, Target};
use launcher::{Launcher, Menu, Settings};
use log::info;

/// Dual-screen cartridge launcher for the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory to start browsing in
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Settings file, created on first save
    #[arg(short, long, default_value = "crabmenu.ini")]
    settings: PathBuf,

    /// Emulator command, overrides the one in the settings file
    #[arg(short, long)]
    emulator: Option<String>,

    /// Where log output goes while the launcher owns the terminal
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let log_path = args
        .log_file
        .unwrap_or_else(|| std::env::temp_dir().join("crabmenu.log"));
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(File::create(&log_path)?)))
        .init();

    let mut settings = Settings::load(&args.settings)?;
    if let Some(emulator) = args.emulator {
        settings.emulator_command = emulator;
    }
    info!("starting in {}, logging to {}", args.dir.display(), log_path.display());

    let menu = Menu::new(settings, args.settings, &args.dir);
    let mut launcher = Launcher::new(menu)?;
    launcher.start()?;
    Ok(())
}

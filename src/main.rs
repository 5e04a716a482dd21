use anyhow::Result;
use std::env;

use idm_scanner::cli::commands::run_cli;
use idm_scanner::gui::app::run_gui;
use idm_scanner::ScanConfig;

fn main() -> Result<()> {
    // Check if we have command line arguments (excluding program name)
    let args: Vec<String> = env::args().collect();

    // If no arguments provided or only "--gui" flag, start GUI
    if args.len() == 1 || (args.len() == 2 && args[1] == "--gui") {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Warn)
            .init();

        println!("Starting IDm Scanner GUI...");
        run_gui(ScanConfig::default())
    } else {
        // CLI mode - pass arguments to CLI parser
        run_cli()
    }
}

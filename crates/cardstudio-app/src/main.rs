//! Main application entry point (native).

use cardstudio_app::{Options, ShortcutRegistry, run};
use clap::Parser;

fn main() {
    env_logger::init();

    // Usage errors exit with 2, --help and --version with 0.
    let options = Options::try_parse().unwrap_or_else(|e| e.exit());

    if options.shortcuts {
        ShortcutRegistry::print_all();
        if options.input.is_none() {
            return;
        }
    }

    log::info!("Starting CardStudio");
    match run(&options) {
        Ok(report) => {
            eprint!("{}", report.summary());
            if options.out.is_none() {
                println!("{}", report.markup);
            }
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

use clap::Parser;
use filebase::cli::Cli;
use filebase::config::Config;
use filebase::error::{ErrorClass, Result};
use filebase::logging;
use filebase::report;
use filebase::scan::fs::{Filesystem, OsFilesystem, SystemClock};
use filebase::scan::Scanner;
use filebase::store::{Scope, Store};
use tracing::{debug, error, info};

fn print_reports(store: &Store, scope: Scope, config: &Config) -> Result<()> {
    for ranking in &config.rankings {
        let result = report::query(store, scope, *ranking, config.list_size)?;

        if config.json_output {
            println!("{}", report::json::render(&result));
        } else {
            println!("{}", report::table::render(&result));
        }
    }
    Ok(())
}

/// Scan and report on every root. Returns false when some root could not
/// be resolved; store errors end the run immediately.
fn run(config: &Config) -> Result<bool> {
    let mut store = Store::open(&config.db_path)?;
    debug!(db = %config.db_path.display(), "opened store");

    if config.roots.is_empty() {
        if config.scan {
            info!("no roots given, reporting on every scanned directory");
        }
        print_reports(&store, Scope::All, config)?;
        return Ok(true);
    }

    let fs = OsFilesystem;
    let clock = SystemClock;
    let mut all_resolved = true;

    for root in &config.roots {
        let scope = if config.scan {
            let mut scanner =
                Scanner::new(&mut store, &fs, &clock).with_batch_size(config.batch_size);
            match scanner.scan(root) {
                Ok(summary) => Scope::Directory(summary.dir_id),
                Err(e) if e.class() == ErrorClass::PathResolution => {
                    all_resolved = false;
                    continue;
                }
                Err(e) => return Err(e),
            }
        } else {
            let canonical = match fs.canonicalize(root) {
                Ok(path) => path,
                Err(e) => {
                    error!(root = %root.display(), error = %e, "cannot resolve root");
                    all_resolved = false;
                    continue;
                }
            };
            match store.find_directory(&canonical)? {
                Some(id) => Scope::Directory(id),
                None => {
                    info!(root = %canonical.display(), "root has never been scanned");
                    continue;
                }
            }
        };

        print_reports(&store, scope, config)?;
    }

    Ok(all_resolved)
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    match run(&config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

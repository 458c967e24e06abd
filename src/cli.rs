use clap::Parser;
use std::path::PathBuf;

use crate::report::Ranking;

#[derive(Parser, Debug)]
#[command(name = "filebase")]
#[command(about = "Track file sizes and ages across scans and rank the biggest, oldest, newest and fastest-growing files")]
#[command(version)]
pub struct Cli {
    /// Directories to scan and report on
    pub roots: Vec<PathBuf>,

    /// Path to the store file (defaults to ~/.filebase.sqlite3)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// List the biggest files
    #[arg(long, default_value_t = false)]
    pub biggest: bool,

    /// List the least recently modified files
    #[arg(long, default_value_t = false)]
    pub oldest: bool,

    /// List the most recently modified files
    #[arg(long, default_value_t = false)]
    pub newest: bool,

    /// List the fastest growing files
    #[arg(long, default_value_t = false)]
    pub fastest: bool,

    /// How many files to list per ranking
    #[arg(long)]
    pub list: Option<usize>,

    /// Don't rescan, just query the existing store
    #[arg(long, default_value_t = false)]
    pub no_scan: bool,

    /// Files written per transaction
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Output rankings as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Requested rankings in display order.
    pub fn rankings(&self) -> Vec<Ranking> {
        Ranking::ALL
            .into_iter()
            .filter(|ranking| match ranking {
                Ranking::Biggest => self.biggest,
                Ranking::Oldest => self.oldest,
                Ranking::Newest => self.newest,
                Ranking::Fastest => self.fastest,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_select_rankings_in_fixed_order() {
        let cli = Cli::parse_from(["filebase", "--fastest", "--biggest", "/data"]);
        assert_eq!(cli.rankings(), vec![Ranking::Biggest, Ranking::Fastest]);
        assert_eq!(cli.roots, vec![PathBuf::from("/data")]);
        assert!(!cli.no_scan);
    }

    #[test]
    fn query_only_options_parse() {
        let cli = Cli::parse_from(["filebase", "--no-scan", "--list", "5", "--db", "/tmp/x.db"]);
        assert!(cli.no_scan);
        assert_eq!(cli.list, Some(5));
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(cli.roots.is_empty());
        assert!(cli.rankings().is_empty());
    }
}

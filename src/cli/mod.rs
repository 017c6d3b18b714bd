mod digest;

use chrono::{Datelike, Local};
use clap::Parser;

use crate::services::data_loader::{DataLoaderService, EngineConfig};
use crate::services::locator::CLAUDE_CONFIG_DIR_ENV;
use crate::types::{Period, Result};

/// Your year with Claude Code, in numbers
#[derive(Parser, Debug)]
#[command(name = "ccwrapped")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Year to summarize (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,

    /// Narrow the summary to one month (1-12)
    #[arg(long)]
    month: Option<u32>,

    /// Comma-separated Claude data directories
    #[arg(long, env = CLAUDE_CONFIG_DIR_ENV)]
    data_dir: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Never fetch pricing; use the on-disk cache only
    #[arg(long)]
    offline: bool,
}

impl Cli {
    fn period(&self) -> Result<Period> {
        let year = self.year.unwrap_or_else(|| Local::now().year());
        match self.month {
            Some(month) => Period::month(year, month),
            None => Ok(Period::year(year)),
        }
    }

    fn config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::new(self.period()?);
        config.data_dirs = self.data_dir.clone();
        config.offline = self.offline;
        Ok(config)
    }

    pub fn run(self) -> anyhow::Result<()> {
        let snapshot = DataLoaderService::new(self.config()?).load()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else if !snapshot.has_data {
            println!("{}", digest::no_data_message(&snapshot));
        } else {
            print!("{}", digest::render(&snapshot));
        }
        Ok(())
    }
}

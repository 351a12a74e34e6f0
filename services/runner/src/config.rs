//! Configuration types and loading
//!
//! Config path precedence: `--config` > `CONFIG_PATH` > `bulk-runner.toml`.
//! Every section except `[input]` falls back to defaults; all values are
//! validated on load so a bad file never reaches dispatch.

use std::fmt;
use std::path::{Path, PathBuf};

use common::Range;
use orchestrator::{MutualSettings, RunSettings, TaskKind, parse_selection};
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub mutual_subscription: MutualSubscriptionConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Worker pool, pacing and account selection
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub threads: usize,
    pub retries: u32,
    pub pause_between_retries: Range,
    pub pause_between_accounts: Range,
    /// 1-based inclusive slice of the account table; `[0, 0]` means all
    pub accounts_range: Range,
    /// 1-based account numbers, used when `accounts_range` is `[0, 0]`
    pub exact_accounts: Vec<usize>,
    pub shuffle_accounts: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let run = RunSettings::default();
        Self {
            threads: run.threads,
            retries: run.retries,
            pause_between_retries: run.pause_between_retries,
            pause_between_accounts: run.pause_between_accounts,
            accounts_range: Range::ZERO,
            exact_accounts: Vec::new(),
            shuffle_accounts: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MutualSubscriptionConfig {
    pub followers_for_every_account: Range,
    pub count_unvalidated_as_failed: bool,
}

impl Default for MutualSubscriptionConfig {
    fn default() -> Self {
        Self {
            followers_for_every_account: Range::new(1, 3),
            count_unvalidated_as_failed: false,
        }
    }
}

/// What a run does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Run the selected tasks on every account
    #[default]
    Tasks,
    /// Accounts follow each other
    MutualSubscription,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Tasks => f.write_str("tasks"),
            Mode::MutualSubscription => f.write_str("mutual_subscription"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    pub mode: Mode,
    /// Task names in execution order
    pub selected: Vec<String>,
}

/// Task input: inline lists, optionally extended from files
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// JSON account table
    pub accounts_file: PathBuf,
    pub follow_targets: Vec<String>,
    pub unfollow_targets: Vec<String>,
    pub like_links: Vec<String>,
    pub retweet_links: Vec<String>,
    pub quote_tweet_links: Vec<String>,
    pub comment_links: Vec<String>,
    pub poll_links: Vec<String>,
    pub poll_choice: Option<String>,
    pub tweets: Vec<String>,
    /// One tweet per line, appended to `tweets`
    pub tweets_file: Option<PathBuf>,
    pub comments: Vec<String>,
    pub comments_file: Option<PathBuf>,
    /// Image files, base64 encoded on load
    pub pictures_dir: Option<PathBuf>,
    pub names: Vec<String>,
    pub bios: Vec<String>,
    pub locations: Vec<String>,
    /// Draw texts and poll links at random instead of by account position
    pub random_texts: bool,
    pub random_pictures: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            accounts_file: PathBuf::from("data/accounts.json"),
            follow_targets: Vec::new(),
            unfollow_targets: Vec::new(),
            like_links: Vec::new(),
            retweet_links: Vec::new(),
            quote_tweet_links: Vec::new(),
            comment_links: Vec::new(),
            poll_links: Vec::new(),
            poll_choice: None,
            tweets: Vec::new(),
            tweets_file: None,
            comments: Vec::new(),
            comments_file: None,
            pictures_dir: None,
            names: Vec::new(),
            bios: Vec::new(),
            locations: Vec::new(),
            random_texts: false,
            random_pictures: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prometheus text exposition written at the end of the run
    pub metrics_path: Option<PathBuf>,
    /// JSON run summary
    pub report_path: Option<PathBuf>,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        self.run_settings()
            .validate()
            .map_err(|e| common::Error::Config(e.to_string()))?;
        self.mutual_settings()
            .validate()
            .map_err(|e| common::Error::Config(e.to_string()))?;
        self.settings.accounts_range.validate("accounts_range")?;

        if self.settings.exact_accounts.contains(&0) {
            return Err(common::Error::Config(
                "exact_accounts entries are 1-based, got 0".into(),
            ));
        }

        if self.tasks.mode == Mode::Tasks {
            if self.tasks.selected.is_empty() {
                return Err(common::Error::Config(
                    "tasks.selected must name at least one task".into(),
                ));
            }
            self.selected_tasks()?;
        }
        Ok(())
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            threads: self.settings.threads,
            retries: self.settings.retries,
            pause_between_retries: self.settings.pause_between_retries,
            pause_between_accounts: self.settings.pause_between_accounts,
        }
    }

    pub fn mutual_settings(&self) -> MutualSettings {
        MutualSettings {
            followers_for_every_account: self.mutual_subscription.followers_for_every_account,
            count_unvalidated_as_failed: self.mutual_subscription.count_unvalidated_as_failed,
        }
    }

    /// Selected tasks, de-duplicated, in execution order.
    pub fn selected_tasks(&self) -> common::Result<Vec<TaskKind>> {
        parse_selection(&self.tasks.selected).map_err(|e| common::Error::Config(e.to_string()))
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("bulk-runner.toml")
    }
}

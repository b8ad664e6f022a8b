//! Startup configuration: an optional TOML file overridden by command-line flags.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const USAGE: &str = "\
usage: columnlife <seed-path> [options]

  <seed-path>              text pattern ('#' alive) or image (dark pixels alive)

options:
  -c, --config <file>      TOML configuration file
  -w, --workers <n>        number of worker threads (default 2)
  -i, --interval-ms <n>    minimum milliseconds between generations (default 0)
  -g, --max-generations <n> stop after n generations (default 0, unbounded)
  -p, --paused             start paused at the seed
  -h, --help               print this message";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads, each owning a column range.
    pub workers: usize,
    /// Upper bound on any single wait before re-checking shutdown and flags.
    pub poll_interval_ms: u64,
    /// Minimum time between published generations, 0 = as fast as possible.
    pub generation_interval_ms: u64,
    /// Publication limit, 0 = unbounded.
    pub max_generations: u64,
    /// Hold at generation 0 until stepped or resumed.
    pub start_paused: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            poll_interval_ms: 1,
            generation_interval_ms: 0,
            max_generations: 0,
            start_paused: false,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn generation_interval(&self) -> Duration {
        Duration::from_millis(self.generation_interval_ms)
    }

    pub fn generation_limit(&self) -> Option<u64> {
        (self.max_generations > 0).then_some(self.max_generations)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.poll_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub refresh_interval_ms: u64,
    pub alive_char: char,
    pub dead_char: char,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 100,
            alive_char: '#',
            dead_char: ' ',
        }
    }
}

impl ViewConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::Invalid(format!("could not read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if self.view.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "view.refresh_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub seed: PathBuf,
    pub config: Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(Args),
    Help,
}

/// Parses the program arguments (without the program name).
///
/// A `--config` file is applied first wherever it appears; the remaining
/// flags then override its values.
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation, ConfigError> {
    let argv: Vec<String> = args.into_iter().collect();

    let mut config = Config::default();
    let mut i = 0;
    while i < argv.len() {
        if matches!(argv[i].as_str(), "--config" | "-c") {
            let path = PathBuf::from(flag_value(&argv, i)?);
            config = Config::load(&path)?;
            i += 1;
        }
        i += 1;
    }

    let mut seed = None;
    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "--help" | "-h" => return Ok(Invocation::Help),
            "--config" | "-c" => i += 1,
            "--workers" | "-w" => {
                config.engine.workers = parse_number(&argv, i)?;
                i += 1;
            }
            "--interval-ms" | "-i" => {
                config.engine.generation_interval_ms = parse_number(&argv, i)?;
                i += 1;
            }
            "--max-generations" | "-g" => {
                config.engine.max_generations = parse_number(&argv, i)?;
                i += 1;
            }
            "--paused" | "-p" => config.engine.start_paused = true,
            flag if flag.starts_with('-') => {
                return Err(ConfigError::Invalid(format!("unknown option {flag}")));
            }
            path if seed.is_none() => seed = Some(PathBuf::from(path)),
            extra => {
                return Err(ConfigError::Invalid(format!("unexpected argument {extra}")));
            }
        }
        i += 1;
    }

    config.validate()?;
    let seed = seed.ok_or_else(|| ConfigError::Invalid("must provide a seed path".into()))?;
    Ok(Invocation::Run(Args { seed, config }))
}

fn flag_value(argv: &[String], i: usize) -> Result<&str, ConfigError> {
    argv.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::Invalid(format!("{} needs a value", argv[i])))
}

fn parse_number<T: std::str::FromStr>(argv: &[String], i: usize) -> Result<T, ConfigError> {
    let value = flag_value(argv, i)?;
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} expects a number, got {value}", argv[i])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.generation_limit(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [engine]
            workers = 8
            max_generations = 40

            [view]
            alive_char = "O"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.workers, 8);
        assert_eq!(config.engine.generation_limit(), Some(40));
        assert_eq!(config.engine.poll_interval_ms, 1);
        assert_eq!(config.view.alive_char, 'O');
        assert_eq!(config.view.refresh_interval_ms, 100);
    }

    #[test]
    fn zero_workers_in_file_is_rejected() {
        let err = Config::from_toml_str("[engine]\nworkers = 0\n").unwrap_err();
        assert_eq!(err, ConfigError::NoWorkers);
    }

    #[test]
    fn malformed_toml_is_invalid() {
        let err = Config::from_toml_str("[engine\nworkers = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn cli_overrides() {
        let Invocation::Run(parsed) =
            parse_args(args("glider.txt -w 4 --interval-ms 50 -p")).unwrap()
        else {
            panic!("expected a run invocation");
        };
        assert_eq!(parsed.seed, PathBuf::from("glider.txt"));
        assert_eq!(parsed.config.engine.workers, 4);
        assert_eq!(parsed.config.engine.generation_interval_ms, 50);
        assert!(parsed.config.engine.start_paused);
    }

    #[test]
    fn cli_errors() {
        assert_eq!(parse_args(args("--help")).unwrap(), Invocation::Help);
        assert!(matches!(parse_args(args("")), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse_args(args("seed.txt -w")), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse_args(args("seed.txt -w many")), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse_args(args("seed.txt --bogus")), Err(ConfigError::Invalid(_))));
        assert_eq!(parse_args(args("seed.txt -w 0")), Err(ConfigError::NoWorkers));
    }
}

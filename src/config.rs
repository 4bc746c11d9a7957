use crate::cli::Args;
use crate::types::{Config, HarvestError};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys accepted in the TOML configuration file. Everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    workers: Option<usize>,
    transfer_timeout_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
    user_agent: Option<String>,
    cache: Option<PathBuf>,
    folder: Option<PathBuf>,
    skip_zones: Option<Vec<String>>,
    sources: Option<SourcesSection>,
    resolver: Option<ResolverSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SourcesSection {
    root_zone: Option<String>,
    public_suffix: Option<String>,
    ntlds: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ResolverSection {
    nameservers: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    use_system_resolver: Option<bool>,
    ns_lookup_rate: Option<u32>,
}

/// Assemble the run configuration: defaults, then the TOML file given with
/// `-c`, then environment overrides, then command line flags.
pub fn load(args: &Args) -> Result<Config, HarvestError> {
    let mut config = match args.config_path.as_deref() {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config)?;
    apply_args(&mut config, args)?;
    validate_config(&config)?;

    Ok(config)
}

/// Defaults with the TOML file at `config_path_str` layered on top.
pub fn load_config(config_path_str: &str) -> Result<Config, HarvestError> {
    let mut config = Config::default();

    if Path::new(config_path_str).exists() {
        let contents = fs::read_to_string(config_path_str).map_err(|e| {
            HarvestError::ConfigError(format!("Failed to read {}: {}", config_path_str, e))
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| {
            HarvestError::ConfigError(format!("Failed to parse {}: {}", config_path_str, e))
        })?;
        apply_file(&mut config, file);
    } else {
        return Err(HarvestError::ConfigError(format!(
            "Configuration file {} does not exist",
            config_path_str
        )));
    }

    Ok(config)
}

fn apply_file(config: &mut Config, file: FileConfig) {
    if let Some(workers) = file.workers {
        config.workers = workers;
    }
    if let Some(secs) = file.transfer_timeout_secs {
        config.transfer_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.http_timeout_secs {
        config.http_timeout = Duration::from_secs(secs);
    }
    if let Some(user_agent) = file.user_agent {
        config.user_agent = user_agent;
    }
    if let Some(cache) = file.cache {
        config.cache_path = cache;
    }
    if let Some(folder) = file.folder {
        config.output.folder = folder;
    }
    if let Some(skip_zones) = file.skip_zones {
        config.skip_zones = skip_zones;
    }
    if let Some(sources) = file.sources {
        if let Some(url) = sources.root_zone {
            config.sources.root_zone = url;
        }
        if let Some(url) = sources.public_suffix {
            config.sources.public_suffix = url;
        }
        if let Some(url) = sources.ntlds {
            config.sources.ntlds = url;
        }
    }
    if let Some(resolver) = file.resolver {
        if let Some(nameservers) = resolver.nameservers {
            config.resolver.nameservers = nameservers;
        }
        if let Some(secs) = resolver.timeout_secs {
            config.resolver.timeout = Duration::from_secs(secs);
        }
        if let Some(system) = resolver.use_system_resolver {
            config.resolver.use_system_resolver = system;
        }
        if let Some(rate) = resolver.ns_lookup_rate {
            config.resolver.ns_lookup_rate = (rate > 0).then_some(rate);
        }
    }
}

fn apply_env_overrides(config: &mut Config) -> Result<(), HarvestError> {
    if let Ok(workers) = env::var("ZONEHARVEST_WORKERS") {
        config.workers = workers.trim().parse().map_err(|e| {
            HarvestError::ConfigError(format!("ZONEHARVEST_WORKERS={}: {}", workers, e))
        })?;
    }
    if let Ok(cache) = env::var("ZONEHARVEST_CACHE") {
        config.cache_path = PathBuf::from(cache);
    }
    Ok(())
}

/// Command line flags take precedence over the file and the environment.
pub fn apply_args(config: &mut Config, args: &Args) -> Result<(), HarvestError> {
    if let Some(workers) = args.workers {
        if workers <= 0 {
            return Err(HarvestError::ConfigError(
                "Number of workers must be greater than zero".to_string(),
            ));
        }
        config.workers = workers as usize;
    }
    if let Some(secs) = args.timeout {
        config.transfer_timeout = Duration::from_secs(secs);
    }
    if let Some(folder) = &args.folder {
        config.output.folder = folder.clone();
    }
    if let Some(cache) = &args.cache {
        config.cache_path = cache.clone();
    }
    if let Some(log_file) = &args.log_file {
        config.output.log_file = Some(log_file.clone());
    }
    if let Some(report) = &args.report {
        config.output.report_file = Some(report.clone());
    }
    if args.verbose {
        config.output.verbose = true;
    }
    if args.silent {
        config.output.silent = true;
    }
    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), HarvestError> {
    if config.workers == 0 {
        return Err(HarvestError::ConfigError(
            "Number of workers must be greater than zero".to_string(),
        ));
    }
    if config.transfer_timeout.as_secs() == 0 {
        return Err(HarvestError::ConfigError(
            "Transfer timeout must be greater than 0".to_string(),
        ));
    }
    if config.http_timeout.as_secs() == 0 {
        return Err(HarvestError::ConfigError(
            "HTTP timeout must be greater than 0".to_string(),
        ));
    }
    for (name, value) in [
        ("root_zone", &config.sources.root_zone),
        ("public_suffix", &config.sources.public_suffix),
        ("ntlds", &config.sources.ntlds),
    ] {
        url::Url::parse(value).map_err(|e| {
            HarvestError::ConfigError(format!("Invalid {} URL {}: {}", name, value, e))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_load_config_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
workers = 8
transfer_timeout_secs = 10
skip_zones = ["arpa"]

[sources]
root_zone = "http://127.0.0.1:8080/root.zone"

[resolver]
nameservers = ["9.9.9.9:53"]
ns_lookup_rate = 0
"#
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.transfer_timeout, Duration::from_secs(10));
        assert_eq!(config.skip_zones, vec!["arpa".to_string()]);
        assert_eq!(config.sources.root_zone, "http://127.0.0.1:8080/root.zone");
        assert_eq!(config.resolver.nameservers, vec!["9.9.9.9:53".to_string()]);
        assert_eq!(config.resolver.ns_lookup_rate, None);
    }

    #[test]
    fn test_env_overrides_apply_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("env-cache.json");
        env::set_var("ZONEHARVEST_WORKERS", "3");
        env::set_var("ZONEHARVEST_CACHE", &cache);

        let from_env = load(&Args::parse_from(["zoneharvest"]));
        let from_flags = load(&Args::parse_from(["zoneharvest", "-p", "7", "--cache", "flag.json"]));

        env::remove_var("ZONEHARVEST_WORKERS");
        env::remove_var("ZONEHARVEST_CACHE");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.workers, 3);
        assert_eq!(from_env.cache_path, cache);

        let from_flags = from_flags.unwrap();
        assert_eq!(from_flags.workers, 7);
        assert_eq!(from_flags.cache_path, PathBuf::from("flag.json"));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let args = Args::parse_from(["zoneharvest", "-c", "/nonexistent/zoneharvest.toml"]);
        assert!(matches!(load(&args), Err(HarvestError::ConfigError(_))));
    }

    #[test]
    fn test_load_config_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "processes = 4").unwrap();
        assert!(load_config(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_apply_args_rejects_non_positive_workers() {
        let mut config = Config::default();
        for value in ["0", "-1"] {
            let args = Args::parse_from(["zoneharvest", "-p", value]);
            assert!(matches!(
                apply_args(&mut config, &args),
                Err(HarvestError::ConfigError(_))
            ));
        }

        let args = Args::parse_from(["zoneharvest", "-p", "5", "-f", "out", "--silent"]);
        apply_args(&mut config, &args).unwrap();
        assert_eq!(config.workers, 5);
        assert_eq!(config.output.folder, PathBuf::from("out"));
        assert!(config.output.silent);
    }

    #[test]
    fn test_validate_config_checks_urls() {
        let mut config = Config::default();
        assert!(validate_config(&config).is_ok());
        config.sources.ntlds = "not a url".to_string();
        assert!(validate_config(&config).is_err());
    }
}

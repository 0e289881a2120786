use std::path::Path;

use clap::Subcommand;
use onair_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "network.ssid", "timing.soon_horizon_secs")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Print the config file location
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the config file for errors
    Validate,
}

pub fn run(path: &Path, action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::read(path)?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::read(path)?;
            config.set(&key, &value)?;
            config.save(path)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::read(path)?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
            }
            Config::default().save(path)?;
            println!("wrote {}", path.display());
            println!("set network.ssid, network.passphrase and routing.* before running");
        }
        ConfigAction::Validate => {
            Config::load(path)?;
            println!("ok");
        }
    }
    Ok(())
}

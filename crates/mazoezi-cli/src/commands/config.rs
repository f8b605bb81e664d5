use clap::{Subcommand, ValueEnum};
use mazoezi_core::Config;

use super::print_json;

/// Top-level tables of `config.toml`.
#[derive(Clone, Copy, ValueEnum)]
pub enum Section {
    Protocol,
    Xp,
    Score,
    Momentum,
    Relapse,
}

impl Section {
    fn key(self) -> &'static str {
        match self {
            Section::Protocol => "protocol",
            Section::Xp => "xp",
            Section::Score => "score",
            Section::Momentum => "momentum",
            Section::Relapse => "relapse",
        }
    }

    fn restore_default(self, config: &mut Config) {
        match self {
            Section::Protocol => config.protocol = Default::default(),
            Section::Xp => config.xp = Default::default(),
            Section::Score => config.score = Default::default(),
            Section::Momentum => config.momentum = Default::default(),
            Section::Relapse => config.relapse = Default::default(),
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value, e.g. "protocol.grace_hours" or "score.completion_weight"
    Get {
        /// <section>.<field>
        key: String,
    },
    /// Change one value and save config.toml
    Set {
        /// <section>.<field>
        key: String,
        value: String,
    },
    /// Print the whole configuration, or one section
    List {
        #[arg(value_enum)]
        section: Option<Section>,
    },
    /// Restore defaults for everything, or one section
    Reset {
        #[arg(value_enum)]
        section: Option<Section>,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown config key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            let before = config.get(&key);
            config.set(&key, &value)?;
            print_json(&serde_json::json!({
                "key": key,
                "previous": before,
                "value": config.get(&key),
            }))?;
        }
        ConfigAction::List { section } => {
            let config = serde_json::to_value(Config::load()?)?;
            match section {
                Some(section) => print_json(&config[section.key()])?,
                None => print_json(&config)?,
            }
        }
        ConfigAction::Reset { section } => {
            let mut config = match section {
                Some(_) => Config::load()?,
                None => Config::default(),
            };
            if let Some(section) = section {
                section.restore_default(&mut config);
            }
            config.save()?;
            print_json(&serde_json::json!({
                "reset": section.map(Section::key).unwrap_or("all"),
            }))?;
        }
    }
    Ok(())
}

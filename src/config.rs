use crate::entities::slots::SlotScheme;
use crate::error::{StoreError, StoreResult};
use crate::world::limits::{ClientVersion, ConfiguredLimits, LimitsOverride};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const USAGE: &str = "satchel <data-root> [character] [client-version]";
pub const SETTINGS_FILE: &str = "satchel.yaml";
pub const DEFAULT_CHARACTER: &str = "default";
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub character: String,
    pub client_version: Option<ClientVersion>,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> StoreResult<Self> {
        let Some(root) = args.get(1) else {
            return Err(StoreError::Usage(USAGE));
        };
        let character = args
            .get(2)
            .cloned()
            .or_else(|| env_value("SATCHEL_CHARACTER"))
            .unwrap_or_else(|| DEFAULT_CHARACTER.to_string());
        let client_version = args
            .get(3)
            .cloned()
            .or_else(|| env_value("SATCHEL_CLIENT"))
            .map(|tag| tag.parse::<ClientVersion>())
            .transpose()?;
        Ok(Self {
            root: Path::new(root).to_path_buf(),
            character,
            client_version,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Contents of `<root>/satchel.yaml`; every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SatchelConfig {
    pub client_version: ClientVersion,
    pub slot_scheme: SlotScheme,
    pub cache_capacity: usize,
    pub limits: BTreeMap<ClientVersion, LimitsOverride>,
}

impl Default for SatchelConfig {
    fn default() -> Self {
        Self {
            client_version: ClientVersion::RoF,
            slot_scheme: SlotScheme::Canonical,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            limits: BTreeMap::new(),
        }
    }
}

impl SatchelConfig {
    /// Reads the settings file under `root`; a missing file yields the defaults.
    pub fn load(root: &Path) -> StoreResult<Self> {
        let path = root.join(SETTINGS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_yaml_str(&content, &path.display().to_string()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(StoreError::io(&path, err)),
        }
    }

    pub fn from_yaml_str(content: &str, context: &str) -> StoreResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).map_err(|err| StoreError::yaml(context, err))?;
        if config.cache_capacity == 0 {
            return Err(StoreError::Config("cache_capacity must be at least 1".to_string()));
        }
        Ok(config)
    }

    pub fn limits_provider(&self) -> ConfiguredLimits {
        ConfiguredLimits::new(self.limits.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::slots::SlotType;
    use crate::world::limits::LimitsProvider;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn root_is_required() {
        assert!(matches!(AppConfig::from_args(&args(&["satchel"])), Err(StoreError::Usage(_))));
    }

    #[test]
    fn positional_arguments_win() {
        let config = AppConfig::from_args(&args(&["satchel", "/data", "Kael", "titanium"])).unwrap();
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.character, "Kael");
        assert_eq!(config.client_version, Some(ClientVersion::Titanium));
        assert!(AppConfig::from_args(&args(&["satchel", "/data", "Kael", "bogus"])).is_err());
    }

    #[test]
    fn settings_file_overrides() {
        let yaml = r#"
client_version: sof
slot_scheme: legacy
cache_capacity: 16
limits:
  sof:
    bag_slots_max: 8
    slot_sizes:
      bank: 16
"#;
        let config = SatchelConfig::from_yaml_str(yaml, "test").unwrap();
        assert_eq!(config.client_version, ClientVersion::SoF);
        assert_eq!(config.slot_scheme, SlotScheme::Legacy);
        assert_eq!(config.cache_capacity, 16);

        let limits = config.limits_provider().limits_for(ClientVersion::SoF);
        assert_eq!(limits.bag_slots_max(), 8);
        assert_eq!(limits.slot_type_size(SlotType::Bank), 16);
    }

    #[test]
    fn empty_or_missing_settings_use_defaults() {
        let config = SatchelConfig::from_yaml_str("", "test").unwrap();
        assert_eq!(config.client_version, ClientVersion::RoF);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        let missing = std::env::temp_dir().join(format!("satchel-config-missing-{}", std::process::id()));
        assert_eq!(SatchelConfig::load(&missing).unwrap().slot_scheme, SlotScheme::Canonical);
        assert!(SatchelConfig::from_yaml_str("cache_capacity: 0", "test").is_err());
    }
}

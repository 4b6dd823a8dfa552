use serde::{Deserialize, Serialize};
use shared::tmu_config::{validate_bytes, ModuleConfig, CONFIG_RECORD_SIZE, CONFIG_STORE_OFFSET};
use shared::tmu_hal::PersistentStore;

use crate::silprintln;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    Corrupt,
    WriteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedConfig {
    pub config: ModuleConfig,
    /// False when defaults were substituted for a missing or corrupt record.
    pub was_valid: bool,
    /// Set if the substituted defaults could not be written back.
    pub persist_error: Option<ConfigError>,
}

/// Owns the persisted configuration record.
pub struct ConfigStore<'a> {
    store: &'a mut dyn PersistentStore,
}

impl<'a> ConfigStore<'a> {
    pub fn new(store: &'a mut dyn PersistentStore) -> Self {
        Self { store }
    }

    /// Reads the persisted record. Anything that fails validation is replaced
    /// by defaults, which are persisted immediately.
    pub fn load(&mut self) -> LoadedConfig {
        match self.read() {
            Ok(config) => LoadedConfig {
                config,
                was_valid: true,
                persist_error: None,
            },
            Err(_) => {
                silprintln!("Stored config is corrupt, restoring defaults");

                let mut config = ModuleConfig::default();
                Self::load_defaults(&mut config);
                let persist_error = self.save(&config).err();

                LoadedConfig {
                    config,
                    was_valid: false,
                    persist_error,
                }
            }
        }
    }

    fn read(&mut self) -> Result<ModuleConfig, ConfigError> {
        let mut bytes = [0u8; CONFIG_RECORD_SIZE];
        self.store
            .get(CONFIG_STORE_OFFSET, &mut bytes)
            .map_err(|_| ConfigError::Corrupt)?;

        if !validate_bytes(&bytes) {
            return Err(ConfigError::Corrupt);
        }

        ModuleConfig::from_bytes(&bytes).ok_or(ConfigError::Corrupt)
    }

    /// Checks magic, version and checksum.
    pub fn validate(config: &ModuleConfig) -> bool {
        config.is_valid()
    }

    pub fn load_defaults(config: &mut ModuleConfig) {
        *config = ModuleConfig::default();
        config.stamp_checksum();
    }

    /// Writes `config` with a freshly computed checksum. The caller's copy is
    /// left untouched.
    pub fn save(&mut self, config: &ModuleConfig) -> Result<(), ConfigError> {
        let mut record = *config;
        record.stamp_checksum();

        self.store
            .put(CONFIG_STORE_OFFSET, &record.to_bytes())
            .map_err(|err| {
                silprintln!("Config save failed: {:?}", err);
                ConfigError::WriteFailed
            })
    }

    pub fn store_mut(&mut self) -> &mut (dyn PersistentStore + 'a) {
        &mut *self.store
    }
}

use crate::*;
use std::env::var;
use std::str::FromStr;

/// Smallest RSA modulus accepted for an election key
pub const MIN_RSA_BITS: usize = 2048;

/// Smallest number of custodian shares that may reconstruct an election key
pub const MIN_THRESHOLD: u8 = 3;

/// Engine configuration
///
/// Can be deserialized from a JSON file or read from `BALLOTSEAL_*` environment variables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the election RSA modulus in bits
    pub rsa_bits: usize,

    /// Number of shares required to reconstruct the election private key
    pub threshold: u8,

    /// Number of shares dealt to custodians
    pub shares: u8,

    /// Lifetime of an offline voting package
    pub offline_package_ttl_hours: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rsa_bits: MIN_RSA_BITS,
            threshold: MIN_THRESHOLD,
            shares: 5,
            offline_package_ttl_hours: 24,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            rsa_bits: env_or("BALLOTSEAL_RSA_BITS", defaults.rsa_bits)?,
            threshold: env_or("BALLOTSEAL_THRESHOLD", defaults.threshold)?,
            shares: env_or("BALLOTSEAL_SHARES", defaults.shares)?,
            offline_package_ttl_hours: env_or(
                "BALLOTSEAL_OFFLINE_TTL_HOURS",
                defaults.offline_package_ttl_hours,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings are safe to run an election with
    pub fn validate(&self) -> Result<(), Error> {
        if self.rsa_bits < MIN_RSA_BITS {
            return Err(Error::Config(format!(
                "rsa_bits must be at least {}, got {}",
                MIN_RSA_BITS, self.rsa_bits
            )));
        }
        if self.threshold < MIN_THRESHOLD {
            return Err(Error::Config(format!(
                "threshold must be at least {}, got {}",
                MIN_THRESHOLD, self.threshold
            )));
        }
        if self.shares < self.threshold {
            return Err(Error::Config(format!(
                "cannot deal {} shares with threshold {}",
                self.shares, self.threshold
            )));
        }
        if self.offline_package_ttl_hours <= 0 {
            return Err(Error::Config(
                "offline_package_ttl_hours must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn offline_package_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.offline_package_ttl_hours)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, Error> {
    match var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid value: {}", name, val))),
        Err(_e) => Ok(default),
    }
}

use crate::*;
use std::env::var;

/// Protocol settings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Fewest options an election may be created with
    pub min_options: usize,

    /// Random bytes in a generated secret
    pub secret_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_options: 2,
            secret_bytes: DEFAULT_SECRET_BYTES,
        }
    }
}

impl Config {
    /// Load settings from the environment
    ///
    /// Reads `COMMITBALLOT_MIN_OPTIONS` and `COMMITBALLOT_SECRET_BYTES`. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Config::default();

        if let Ok(val) = var("COMMITBALLOT_MIN_OPTIONS") {
            config.min_options = parse_setting("COMMITBALLOT_MIN_OPTIONS", &val)?;
        }
        if let Ok(val) = var("COMMITBALLOT_SECRET_BYTES") {
            config.secret_bytes = parse_setting("COMMITBALLOT_SECRET_BYTES", &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.min_options < 1 {
            return Err(Error::InvalidConfig(
                "min_options must be at least 1".to_owned(),
            ));
        }
        if self.secret_bytes < MIN_SECRET_BYTES {
            return Err(Error::InvalidConfig(format!(
                "secret_bytes must be at least {}",
                MIN_SECRET_BYTES
            )));
        }
        Ok(())
    }
}

fn parse_setting(name: &str, val: &str) -> Result<usize, Error> {
    val.trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} is not a number: {:?}", name, val)))
}

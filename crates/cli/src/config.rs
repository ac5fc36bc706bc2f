//! Loading bridge configuration from a TOML file plus command-line overrides.

use anyhow::Context;
use std::path::Path;
use tapbridge_net::{BridgeConfig, ListenAddr, MacAddr};

/// Settings given on the command line; each one wins over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub listen: Option<ListenAddr>,
    pub mtu: Option<u32>,
    pub mac: Option<MacAddr>,
    pub debug: bool,
}

/// Build the effective configuration.
///
/// Starts from the defaults, or from `path` when given, then applies
/// `overrides` and validates the result.
pub fn load(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<BridgeConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("cannot parse config file {}", path.display()))?
        }
        None => BridgeConfig::default(),
    };

    if let Some(listen) = overrides.listen {
        config.listen = listen;
    }
    if let Some(mtu) = overrides.mtu {
        config.mtu = mtu;
    }
    if let Some(mac) = overrides.mac {
        config.mac = mac;
    }
    config.debug |= overrides.debug;

    config.validate()?;
    Ok(config)
}

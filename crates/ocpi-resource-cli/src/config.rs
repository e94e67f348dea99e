//! Environment configuration for the CLI.

use anyhow::{bail, Context, Result};
use ocpi_resource_core::PartyId;

/// Settings that apply to every command unless overridden by a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Accept patches that move `last_updated` backwards
    pub allow_downgrade: bool,
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Party hint for bodies without owner information
    pub party: Option<PartyId>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            allow_downgrade: false,
            pretty: false,
            party: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from `OCPI_RESOURCE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Fails if a variable is set to a value that does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(filter) = lookup("OCPI_RESOURCE_LOG") {
            config.log_filter = filter;
        }

        if let Some(flag) = lookup("OCPI_RESOURCE_ALLOW_DOWNGRADE") {
            config.allow_downgrade =
                parse_flag(&flag).context("Invalid OCPI_RESOURCE_ALLOW_DOWNGRADE")?;
        }

        if let Some(flag) = lookup("OCPI_RESOURCE_PRETTY") {
            config.pretty = parse_flag(&flag).context("Invalid OCPI_RESOURCE_PRETTY")?;
        }

        if let Some(party) = lookup("OCPI_RESOURCE_PARTY") {
            config.party = Some(party.parse().context("Invalid OCPI_RESOURCE_PARTY")?);
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("'{other}' is not a boolean"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<CliConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CliConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(load(&[]).unwrap(), CliConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            ("OCPI_RESOURCE_LOG", "debug"),
            ("OCPI_RESOURCE_ALLOW_DOWNGRADE", "yes"),
            ("OCPI_RESOURCE_PRETTY", "1"),
            ("OCPI_RESOURCE_PARTY", "DE*GEF"),
        ])
        .unwrap();
        assert_eq!(config.log_filter, "debug");
        assert!(config.allow_downgrade);
        assert!(config.pretty);
        assert_eq!(config.party, Some(PartyId::new("DE", "GEF").unwrap()));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[("OCPI_RESOURCE_PRETTY", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("OCPI_RESOURCE_PRETTY"));

        let err = load(&[("OCPI_RESOURCE_PARTY", "DEGEF")]).unwrap_err();
        assert!(err.to_string().contains("OCPI_RESOURCE_PARTY"));
    }
}

//! # OCPI Resource CLI
//!
//! Command-line utilities for validating, hashing and patching OCPI
//! resources stored as JSON files.

mod config;

use anyhow::{bail, Context, Result};
use config::CliConfig;
use ocpi_resource_core::{IdentityHints, Patchable, PatchOptions, SerializeOptions, Serializable};
use ocpi_resource_model::{
    ChargeDetailRecord, ChargingStation, EnergyMeter, Evse, Location, Session, TariffAssociation,
};
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = CliConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "validate" | "hash" | "canonical" | "patch" => {
            let command: Command = args[1].parse()?;
            let invocation = match Invocation::parse(command, &args[2..], &config) {
                Ok(invocation) => invocation,
                Err(err) => {
                    eprintln!("{err:#}");
                    eprintln!("Usage: ocpi-resource {}", command.usage());
                    std::process::exit(1);
                }
            };
            println!("{}", invocation.run()?);
        }
        "kinds" => {
            for kind in Kind::ALL {
                println!("{}", kind.name());
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Validate,
    Hash,
    Canonical,
    Patch,
}

impl Command {
    fn usage(self) -> &'static str {
        match self {
            Self::Validate => "validate <kind> <file> [--party CC*PPP] [--id ID] [--version N]",
            Self::Hash => "hash <kind> <file> [--party CC*PPP] [--id ID] [--version N]",
            Self::Canonical => "canonical <kind> <file> [--pretty] [--party CC*PPP]",
            Self::Patch => "patch <kind> <file> <patch-file> [--allow-downgrade] [--pretty]",
        }
    }

    fn positionals(self) -> usize {
        match self {
            Self::Patch => 3,
            _ => 2,
        }
    }
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "validate" => Self::Validate,
            "hash" => Self::Hash,
            "canonical" => Self::Canonical,
            "patch" => Self::Patch,
            other => bail!("Unknown command: {other}"),
        })
    }
}

/// Resource kinds addressable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Location,
    ChargingStation,
    Evse,
    EnergyMeter,
    Session,
    Cdr,
    TariffAssociation,
}

impl Kind {
    const ALL: [Self; 7] = [
        Self::Location,
        Self::ChargingStation,
        Self::Evse,
        Self::EnergyMeter,
        Self::Session,
        Self::Cdr,
        Self::TariffAssociation,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::ChargingStation => "charging-station",
            Self::Evse => "evse",
            Self::EnergyMeter => "energy-meter",
            Self::Session => "session",
            Self::Cdr => "cdr",
            Self::TariffAssociation => "tariff-association",
        }
    }
}

impl FromStr for Kind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .with_context(|| format!("Unknown resource kind '{s}' (see `ocpi-resource kinds`)"))
    }
}

/// A fully parsed command line.
#[derive(Debug)]
struct Invocation {
    command: Command,
    kind: Kind,
    file: PathBuf,
    patch_file: Option<PathBuf>,
    hints: IdentityHints,
    patch_options: PatchOptions,
    pretty: bool,
}

impl Invocation {
    fn parse(command: Command, args: &[String], config: &CliConfig) -> Result<Self> {
        let mut positionals = Vec::new();
        let mut hints = IdentityHints {
            party_id: config.party.clone(),
            ..IdentityHints::none()
        };
        let mut patch_options = PatchOptions {
            allow_downgrade: config.allow_downgrade,
            now: None,
        };
        let mut pretty = config.pretty;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--party" => {
                    let value = iter.next().context("--party needs a value")?;
                    hints.party_id = Some(value.parse().context("Invalid --party")?);
                }
                "--id" => {
                    let value = iter.next().context("--id needs a value")?;
                    hints.id = Some(value.clone());
                }
                "--version" => {
                    let value = iter.next().context("--version needs a value")?;
                    hints.version = Some(value.parse().context("Invalid --version")?);
                }
                "--allow-downgrade" => patch_options.allow_downgrade = true,
                "--pretty" => pretty = true,
                flag if flag.starts_with("--") => bail!("Unknown option: {flag}"),
                _ => positionals.push(arg.as_str()),
            }
        }

        if positionals.len() != command.positionals() {
            bail!(
                "Expected {} arguments, got {}",
                command.positionals(),
                positionals.len()
            );
        }

        Ok(Self {
            command,
            kind: positionals[0].parse()?,
            file: PathBuf::from(positionals[1]),
            patch_file: positionals.get(2).map(|path| PathBuf::from(*path)),
            hints,
            patch_options,
            pretty,
        })
    }

    fn run(&self) -> Result<String> {
        match self.kind {
            Kind::Location => self.execute::<Location>(),
            Kind::ChargingStation => self.execute::<ChargingStation>(),
            Kind::Evse => self.execute::<Evse>(),
            Kind::EnergyMeter => self.execute::<EnergyMeter>(),
            Kind::Session => self.execute::<Session>(),
            Kind::Cdr => self.execute::<ChargeDetailRecord>(),
            Kind::TariffAssociation => self.execute::<TariffAssociation>(),
        }
    }

    fn execute<T: Patchable>(&self) -> Result<String> {
        let text = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let resource = T::parse_text(&text, &self.hints)
            .with_context(|| format!("Invalid {} in {}", T::KIND, self.file.display()))?;
        tracing::debug!(kind = T::KIND, identity = %resource.identity(), "Parsed resource");

        match self.command {
            Command::Validate => Ok(format!(
                "{} {} {}",
                T::KIND,
                resource.identity(),
                resource.etag()
            )),
            Command::Hash => Ok(resource.etag().to_string()),
            Command::Canonical => self.render(&resource),
            Command::Patch => {
                let path = self
                    .patch_file
                    .as_ref()
                    .context("patch needs a patch file")?;
                let patch_text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let patch: Value = serde_json::from_str(&patch_text)
                    .with_context(|| format!("{} is not valid JSON", path.display()))?;
                let patched = resource
                    .try_patch(&patch, self.patch_options)
                    .with_context(|| format!("Failed to patch {}", resource.identity()))?;
                tracing::info!(
                    kind = T::KIND,
                    identity = %patched.identity(),
                    etag = %patched.etag(),
                    "Patched resource"
                );
                self.render(&patched)
            }
        }
    }

    fn render<T: Serializable>(&self, resource: &T) -> Result<String> {
        if self.pretty {
            let value = Value::Object(resource.to_json(SerializeOptions::ALL));
            Ok(serde_json::to_string_pretty(&value)?)
        } else {
            Ok(resource.to_json_text(SerializeOptions::ALL))
        }
    }
}

fn print_help() {
    println!(
        r#"OCPI Resource CLI

USAGE:
    ocpi-resource <COMMAND> [OPTIONS]

COMMANDS:
    validate <kind> <file>               Parse a resource and print kind, identity and ETag
    hash <kind> <file>                   Print the ETag of a resource
    canonical <kind> <file>              Print the canonical JSON form
    patch <kind> <file> <patch-file>     Apply a JSON merge patch and print the result
    kinds                                List the supported resource kinds
    help                                 Show this help message

OPTIONS:
    --party CC*PPP       Party hint for bodies without country_code/party_id
    --id ID              Id hint; must match the body if both are present
    --version N          Version hint
    --allow-downgrade    Accept a patched last_updated older than the current one
    --pretty             Pretty-print JSON output

ENVIRONMENT:
    OCPI_RESOURCE_LOG              Log filter when RUST_LOG is unset (default: warn)
    OCPI_RESOURCE_PARTY            Default --party
    OCPI_RESOURCE_ALLOW_DOWNGRADE  Default --allow-downgrade
    OCPI_RESOURCE_PRETTY           Default --pretty

EXAMPLES:
    ocpi-resource validate location loc1.json
    ocpi-resource hash session session.json --party NL*ABC
    ocpi-resource patch location loc1.json rename.json
"#
    );
}

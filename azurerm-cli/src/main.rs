use std::{collections::HashMap, error::Error, path::PathBuf, str::FromStr};

use azurerm::prelude::*;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

mod id;
mod lifecycle;

/// Inspect Azure resource IDs and manage Azure resources declared in manifests
#[derive(Debug, Parser)]
#[command(name = "azurerm", version, about, long_about = None)]
struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "AZURERM_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Work with resource IDs
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },

    /// List the supported resource types
    Types,

    /// Print the schema of a resource type as JSON
    Schema {
        /// e.g. azurerm_resource_group
        resource_type: String,
    },

    /// Create, update or replace every resource declared in a manifest
    Apply {
        /// Path to the manifest file
        #[arg(short, long)]
        file: PathBuf,

        /// k=v list of parameters to pass to the manifest
        /// e.g. azurerm apply -f stack.yml -p env=dev -p region=westeurope
        #[arg(short, long, value_parser = parse_key_val::<String, String>)]
        params: Option<Vec<(String, String)>>,

        /// State file recording the applied resources
        #[arg(long, default_value = "azurerm.state.json")]
        state: PathBuf,

        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Read a resource from Azure and print its state
    Read {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Delete a resource
    Destroy {
        #[command(flatten)]
        target: Target,

        /// Also drop the resource from this state file
        #[arg(long)]
        state: Option<PathBuf>,

        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Adopt an existing resource and print its state
    Import {
        #[command(flatten)]
        target: Target,

        /// Also record the resource in this state file
        #[arg(long)]
        state: Option<PathBuf>,

        #[command(flatten)]
        provider: ProviderArgs,
    },
}

#[derive(Debug, Subcommand)]
enum IdCommands {
    /// Parse an ID and print its segments as JSON
    Parse {
        /// ID kind, see `azurerm id types`
        #[arg(long = "type")]
        kind: String,

        id: String,

        /// Accept literal segments in any casing
        #[arg(long)]
        insensitive: bool,
    },

    /// List the supported ID kinds with an example of each
    Types,
}

#[derive(Debug, Args)]
struct Target {
    /// Resource type, e.g. azurerm_resource_group
    #[arg(long = "type")]
    resource_type: String,

    /// Resource ID
    #[arg(long)]
    id: String,
}

/// Provider settings, each also read from its `ARM_*` variable
#[derive(Debug, Args)]
struct ProviderArgs {
    #[arg(long, env = "ARM_SUBSCRIPTION_ID")]
    subscription_id: Option<String>,

    #[arg(long, env = "ARM_TENANT_ID")]
    tenant_id: Option<String>,

    #[arg(long, env = "ARM_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "ARM_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// public, usgovernment or china
    #[arg(long, env = "ARM_ENVIRONMENT")]
    environment: Option<String>,

    /// Resource Manager endpoint overriding the environment's
    #[arg(long, env = "ARM_ENDPOINT")]
    endpoint: Option<Url>,

    /// Static bearer token used instead of client credentials
    #[arg(long, env = "ARM_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[arg(long, env = "ARM_SKIP_PROVIDER_REGISTRATION")]
    skip_provider_registration: bool,
}

impl From<ProviderArgs> for ProviderConfig {
    fn from(args: ProviderArgs) -> Self {
        ProviderConfig {
            subscription_id: args.subscription_id,
            tenant_id: args.tenant_id,
            client_id: args.client_id,
            client_secret: args.client_secret,
            environment: args.environment,
            resource_manager_endpoint: args.endpoint,
            access_token: args.access_token,
            skip_provider_registration: args.skip_provider_registration,
            ..ProviderConfig::default()
        }
    }
}

fn parse_key_val<T, U>(s: &str) -> Result<(T, U), Box<dyn Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Id { command } => match command {
            IdCommands::Parse {
                kind,
                id,
                insensitive,
            } => print_json(&id::parse(&kind, &id, insensitive)?)?,
            IdCommands::Types => {
                for (name, _, example) in id::ID_KINDS {
                    println!("{name:<24} {}", example());
                }
            }
        },
        Commands::Types => {
            for resource in azurerm::resources::all() {
                println!("{}", resource.type_name());
            }
        }
        Commands::Schema { resource_type } => {
            let resource = azurerm::resources::all()
                .into_iter()
                .find(|r| r.type_name() == resource_type)
                .ok_or_else(|| azurerm::Error::UnknownResourceType(resource_type))?;
            print_json(&resource.schema())?;
        }
        Commands::Apply {
            file,
            params,
            state,
            provider,
        } => {
            let params = HashMap::from_iter(params.unwrap_or_default());
            let applied = lifecycle::apply(file, params, state, provider.into()).await?;
            print_json(&applied)?;
        }
        Commands::Read { target, provider } => {
            let state = lifecycle::read(&target.resource_type, &target.id, provider.into()).await?;
            print_json(&state)?;
        }
        Commands::Destroy {
            target,
            state,
            provider,
        } => {
            lifecycle::destroy(&target.resource_type, &target.id, state, provider.into()).await?;
        }
        Commands::Import {
            target,
            state,
            provider,
        } => {
            let imported =
                lifecycle::import(&target.resource_type, &target.id, state, provider.into()).await?;
            print_json(&imported)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = Level::from_str(cli.log_level.to_lowercase().as_str()).unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    if let Err(error) = run(cli.command).await {
        match error.downcast::<azurerm::Error>() {
            Ok(error) => eprintln!("{:?}", miette::Report::new(error)),
            Err(error) => eprintln!("Error: {error:?}"),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("env=dev", ("env", "dev"))]
    #[case("filter=a=b", ("filter", "a=b"))]
    #[case("empty=", ("empty", ""))]
    fn key_values(#[case] input: &str, #[case] expected: (&str, &str)) {
        let (key, value) = parse_key_val::<String, String>(input).unwrap();
        assert_eq!((key.as_str(), value.as_str()), expected);
    }

    #[test]
    fn key_values_need_a_separator() {
        assert!(parse_key_val::<String, String>("env").is_err());
    }

    #[test]
    fn apply_collects_params() {
        let cli = Cli::try_parse_from([
            "azurerm", "apply", "-f", "stack.yml", "-p", "env=dev", "-p", "region=westeurope",
            "--subscription-id", "sub",
        ])
        .unwrap();

        let Commands::Apply { params, state, provider, .. } = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(params.unwrap().len(), 2);
        assert_eq!(state, PathBuf::from("azurerm.state.json"));
        assert_eq!(provider.subscription_id.as_deref(), Some("sub"));
    }
}

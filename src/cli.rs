use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use object_storage::{Endpoints, Region};
use std::{env, path::PathBuf};

/// Resolved settings for one CLI invocation.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoints: Endpoints,
    pub project_id: String,
    pub user_id: String,
    pub password: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Swift object storage client")]
pub struct Args {
    /// Region to use: dallas or london (overrides OBJECT_STORAGE_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Project ID to scope the token to (overrides OBJECT_STORAGE_PROJECT_ID)
    #[arg(long)]
    pub project_id: Option<String>,

    /// User ID (overrides OBJECT_STORAGE_USER_ID)
    #[arg(long)]
    pub user_id: Option<String>,

    /// Password (overrides OBJECT_STORAGE_PASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// Keystone token URL for private deployments (overrides OBJECT_STORAGE_IDENTITY_URL)
    #[arg(long, requires = "account_url_prefix")]
    pub identity_url: Option<String>,

    /// Account URL prefix the project ID is appended to
    /// (overrides OBJECT_STORAGE_ACCOUNT_URL_PREFIX)
    #[arg(long, requires = "identity_url")]
    pub account_url_prefix: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List containers in the account
    Containers,
    /// Create a container (no error if it exists)
    Create { container: String },
    /// List objects in a container
    Objects { container: String },
    /// Upload a file as an object
    Put {
        container: String,
        object: String,
        file: PathBuf,
    },
    /// Download an object to a file, or stdout when no file is given
    Get {
        container: String,
        object: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete an object, or the container itself when no object is given
    Delete {
        container: String,
        object: Option<String>,
    },
    /// Show metadata of the account, a container, or an object
    Stat {
        container: Option<String>,
        object: Option<String>,
    },
    /// Set metadata headers (NAME=VALUE, names sent as given)
    SetMeta {
        #[arg(long)]
        container: Option<String>,
        #[arg(long, requires = "container")]
        object: Option<String>,
        #[arg(required = true, value_parser = parse_pair)]
        entries: Vec<(String, String)>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))
}

impl AppConfig {
    /// Merge parsed CLI args over `OBJECT_STORAGE_*` environment variables.
    pub fn from_env_and_args(args: &Args) -> Result<Self> {
        let endpoints = match (&args.identity_url, &args.account_url_prefix) {
            (Some(identity), Some(prefix)) => Endpoints::new(identity, prefix),
            _ => match (
                env::var("OBJECT_STORAGE_IDENTITY_URL"),
                env::var("OBJECT_STORAGE_ACCOUNT_URL_PREFIX"),
            ) {
                (Ok(identity), Ok(prefix)) => Endpoints::new(identity, prefix),
                _ => {
                    let raw = match &args.region {
                        Some(region) => region.clone(),
                        None => env::var("OBJECT_STORAGE_REGION")
                            .unwrap_or_else(|_| "dallas".into()),
                    };
                    let region: Region = raw
                        .parse()
                        .with_context(|| format!("parsing region `{}`", raw))?;
                    region.endpoints()
                }
            },
        };

        let cfg = Self {
            endpoints,
            project_id: required(&args.project_id, "OBJECT_STORAGE_PROJECT_ID")?,
            user_id: required(&args.user_id, "OBJECT_STORAGE_USER_ID")?,
            password: required(&args.password, "OBJECT_STORAGE_PASSWORD")?,
        };

        Ok(cfg)
    }
}

fn required(arg: &Option<String>, var: &str) -> Result<String> {
    if let Some(value) = arg {
        return Ok(value.clone());
    }
    match env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        Ok(_) | Err(env::VarError::NotPresent) => {
            bail!("{} is not set and no matching flag was given", var)
        }
        Err(err) => Err(err).with_context(|| format!("reading {}", var)),
    }
}

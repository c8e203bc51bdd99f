use anyhow::{Context, Result};
use clap::Parser;
use object_storage::{Container, Object, ObjectStorage};
use tokio::{fs, io::AsyncWriteExt};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{AppConfig, Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config ---
    let args = Args::parse();
    let cfg = AppConfig::from_env_and_args(&args)?;
    tracing::debug!("using endpoints {:?}", cfg.endpoints);

    // --- Authenticate ---
    let storage = ObjectStorage::builder()
        .endpoints(cfg.endpoints.clone())
        .build()?;
    storage
        .connect(&cfg.project_id, &cfg.user_id, &cfg.password)
        .await
        .context("authenticating with object storage")?;
    tracing::info!("authenticated as {} in project {}", cfg.user_id, cfg.project_id);

    run(&storage, args.command).await
}

async fn run(storage: &ObjectStorage, command: Command) -> Result<()> {
    match command {
        Command::Containers => {
            for container in storage.list_containers().await? {
                println!("{}", container);
            }
        }
        Command::Create { container } => {
            let created = storage.create_container(&container).await?;
            println!("{}", created.url()?);
        }
        Command::Objects { container } => {
            let container = storage.get_container(&container).await?;
            for object in container.list_objects().await? {
                println!("{}", object);
            }
        }
        Command::Put {
            container,
            object,
            file,
        } => {
            let data = fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let stored = Container::new(storage, container)
                .store_object(&object, data)
                .await?;
            println!("{}", stored.url()?);
        }
        Command::Get {
            container,
            object,
            output,
        } => {
            let fetched = Container::new(storage, container).get_object(&object).await?;
            let data = fetched.cached_data().cloned().unwrap_or_default();
            match output {
                Some(path) => fs::write(&path, &data)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Delete { container, object } => {
            let container = Container::new(storage, container);
            match object {
                Some(object) => container.delete_object(&object).await?,
                None => container.delete().await?,
            }
        }
        Command::Stat { container, object } => {
            let metadata = match (container, object) {
                (None, _) => storage.account_metadata().await?,
                (Some(container), None) => Container::new(storage, container).metadata().await?,
                (Some(container), Some(object)) => {
                    Object::new(&Container::new(storage, container), object, None)
                        .metadata()
                        .await?
                }
            };
            let mut names: Vec<_> = metadata.keys().collect();
            names.sort();
            for name in names {
                println!("{}: {}", name, metadata[name].join(", "));
            }
        }
        Command::SetMeta {
            container,
            object,
            entries,
        } => match (container, object) {
            (None, _) => storage.update_account_metadata(entries).await?,
            (Some(container), None) => {
                Container::new(storage, container)
                    .update_metadata(entries)
                    .await?
            }
            (Some(container), Some(object)) => {
                Object::new(&Container::new(storage, container), object, None)
                    .update_metadata(entries)
                    .await?
            }
        },
    }

    Ok(())
}

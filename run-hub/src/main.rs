//! Command-line access to a run hub backed by a local file store.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use run_hub_core::model::{Attributes, FileRecord, NewProject, NewRun, Owner};
use run_hub_core::path::DocPath;
use run_hub_core::store::FileStore;
use run_hub_core::RunHub;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::HubConfig;

#[derive(Parser)]
#[command(name = "run-hub")]
#[command(about = "Inspect and provision owners, projects, runs and files")]
struct Cli {
    /// Store directory
    #[arg(long, global = true, env = "RUN_HUB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Write even when the signed-in user may not modify the owner
    #[arg(long, global = true)]
    force: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the signed-in user's urlslug
    Whoami,

    /// Check whether the signed-in user may modify an owner's resources
    CanModify { owner: String },

    Owner {
        #[command(subcommand)]
        action: OwnerAction,
    },

    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    Run {
        #[command(subcommand)]
        action: RunAction,
    },

    File {
        #[command(subcommand)]
        action: FileAction,
    },

    /// Merge a JSON object into the document at a raw path
    Update { path: String, json: String },

    /// End the current session
    Logout,
}

#[derive(Subcommand)]
enum OwnerAction {
    /// Provision a user or team
    Add {
        urlslug: String,
        /// Session uid that signs in as this owner
        #[arg(long)]
        uid: Option<String>,
        #[arg(long)]
        group: bool,
        #[arg(long = "member")]
        members: Vec<String>,
    },
    Show { urlslug: String },
}

#[derive(Subcommand)]
enum ProjectAction {
    List { owner: String },
    Show { owner: String, project: String },
    Create {
        owner: String,
        urlslug: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        public: bool,
        #[arg(long)]
        mvizkey: Option<String>,
    },
}

#[derive(Subcommand)]
enum RunAction {
    List { owner: String, project: String },
    Show {
        owner: String,
        project: String,
        run_id: String,
    },
    Create {
        owner: String,
        project: String,
        run_id: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        public: bool,
    },
}

#[derive(Subcommand)]
enum FileAction {
    List {
        owner: String,
        project: String,
        run_id: String,
    },
    Add {
        owner: String,
        project: String,
        run_id: String,
        /// `name` or `name:size_in_bytes`; repeat for several files
        #[arg(long = "file", required = true)]
        files: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = HubConfig::from_env();
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }

    let store = Arc::new(
        FileStore::open(&config.data_dir)
            .with_context(|| format!("opening store at {}", config.data_dir.display()))?,
    );
    let hub = RunHub::new(store, config.sessions()?);
    run(&hub, cli.command, cli.force).await
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn ensure_can_modify(hub: &RunHub, owner: &str, force: bool) -> Result<()> {
    if force || hub.can_user_modify(owner).await? {
        return Ok(());
    }
    bail!("not permitted to modify resources of `{owner}` (use --force to override)")
}

/// Split `name[:size]` into a filename and optional byte size.
fn parse_file_arg(arg: &str) -> Result<(String, Option<u64>)> {
    match arg.rsplit_once(':') {
        Some((name, size)) => {
            let size = size
                .parse()
                .with_context(|| format!("invalid size in `{arg}`"))?;
            Ok((name.to_string(), Some(size)))
        }
        None => Ok((arg.to_string(), None)),
    }
}

async fn run(hub: &RunHub, command: Commands, force: bool) -> Result<()> {
    match command {
        Commands::Whoami => print(&hub.current_user().await?),
        Commands::CanModify { owner } => print(&hub.can_user_modify(&owner).await?),
        Commands::Owner { action } => match action {
            OwnerAction::Add {
                urlslug,
                uid,
                group,
                members,
            } => {
                let owner = Owner {
                    uid,
                    urlslug,
                    isgroup: group,
                    members,
                };
                hub.create_owner(owner.clone()).await?;
                info!(urlslug = %owner.urlslug, "owner provisioned");
                print(&owner)
            }
            OwnerAction::Show { urlslug } => print(&hub.get_owner(&urlslug).await?),
        },
        Commands::Project { action } => match action {
            ProjectAction::List { owner } => print(&hub.get_projects_for_user(&owner).await?),
            ProjectAction::Show { owner, project } => {
                print(&hub.get_project(&owner, &project).await?)
            }
            ProjectAction::Create {
                owner,
                urlslug,
                title,
                description,
                public,
                mvizkey,
            } => {
                ensure_can_modify(hub, &owner, force).await?;
                let project = hub
                    .create_project(NewProject {
                        owner,
                        title,
                        urlslug,
                        description,
                        public: Some(public),
                        mvizkey,
                        imported: None,
                    })
                    .await?;
                print(&project)
            }
        },
        Commands::Run { action } => match action {
            RunAction::List { owner, project } => print(&hub.get_runs(&owner, &project).await?),
            RunAction::Show {
                owner,
                project,
                run_id,
            } => print(&hub.get_run(&owner, &project, &run_id).await?),
            RunAction::Create {
                owner,
                project,
                run_id,
                description,
                public,
            } => {
                ensure_can_modify(hub, &owner, force).await?;
                let run = hub
                    .create_run(NewRun {
                        owner,
                        project,
                        run_id,
                        description,
                        public: Some(public),
                    })
                    .await?;
                print(&run)
            }
        },
        Commands::File { action } => match action {
            FileAction::List {
                owner,
                project,
                run_id,
            } => print(&hub.get_files(&owner, &project, &run_id).await?),
            FileAction::Add {
                owner,
                project,
                run_id,
                files,
            } => {
                ensure_can_modify(hub, &owner, force).await?;
                let records = files
                    .iter()
                    .map(|arg| {
                        let (filename, sizeinbytes) = parse_file_arg(arg)?;
                        Ok(FileRecord {
                            owner: owner.clone(),
                            project: project.clone(),
                            run_id: run_id.clone(),
                            filename,
                            sizeinbytes,
                            mvizkey: None,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                hub.add_files(&records).await?;
                info!(count = records.len(), "files added");
                print(&records)
            }
        },
        Commands::Update { path, json } => {
            let attributes: Attributes = match serde_json::from_str::<serde_json::Value>(&json)? {
                serde_json::Value::Object(map) => map,
                _ => bail!("update payload must be a JSON object"),
            };
            if let Some(owner) = path.strip_prefix("users/").and_then(|p| p.split('/').next()) {
                ensure_can_modify(hub, owner, force).await?;
            }
            hub.update_doc(&path, attributes).await?;
            print(&hub.store().get_document(&DocPath::parse(&path)?).await?)
        }
        Commands::Logout => print(&hub.logout().await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use run_hub_core::session::StaticSession;
    use run_hub_core::store::MemoryStore;

    #[test]
    fn file_argument_with_and_without_size() {
        assert_eq!(parse_file_arg("out.csv").unwrap(), ("out.csv".to_string(), None));
        assert_eq!(
            parse_file_arg("out.csv:2048").unwrap(),
            ("out.csv".to_string(), Some(2048))
        );
        assert!(parse_file_arg("out.csv:big").is_err());
    }

    #[test]
    fn data_dir_flag_falls_back_to_env() {
        let cmd = Cli::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id() == "data_dir")
            .unwrap();
        assert_eq!(arg.get_env().unwrap(), "RUN_HUB_DATA_DIR");
    }

    #[test]
    fn cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "run-hub", "file", "add", "ada", "engine", "r1", "--file", "a.csv", "--file",
            "b.csv:10",
        ])
        .unwrap();
        match cli.command {
            Commands::File {
                action: FileAction::Add { files, .. },
            } => assert_eq!(files, vec!["a.csv", "b.csv:10"]),
            _ => panic!("wrong command"),
        }
    }

    #[tokio::test]
    async fn writes_are_refused_without_permission() {
        let hub = RunHub::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticSession::signed_out()),
        );
        let create = || Commands::Project {
            action: ProjectAction::Create {
                owner: "ada".into(),
                urlslug: "engine".into(),
                title: "Engine".into(),
                description: String::new(),
                public: false,
                mvizkey: None,
            },
        };
        assert!(run(&hub, create(), false).await.is_err());
        assert!(hub.get_project("ada", "engine").await.unwrap().is_none());

        run(&hub, create(), true).await.unwrap();
        assert!(hub.get_project("ada", "engine").await.unwrap().is_some());
    }
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::auth::Token;
use crate::config::{Config, ProjectConfig};
use crate::exporter::{spawn_schedules, spawn_workers, Exporter, PullingQueue, Task};
use crate::output::{print_summary, DiscoveryProgress};
use crate::providers::GitLabClient;
use crate::schemas::{Project, ProjectsRefs};
use crate::store::Store;

#[derive(Parser)]
#[command(name = "refscout")]
#[command(author, version, about = "GitLab ref discovery", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./refscout.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the JSON snapshot to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// GitLab instance URL, overrides the configuration file
    #[arg(short = 'u', long, global = true)]
    gitlab_url: Option<String>,

    #[arg(short, long, global = true, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Project to monitor, in addition to the configured ones (repeatable)
    #[arg(short = 'P', long = "project", global = true)]
    projects: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every project's refs once and print what is tracked
    Discover {
        /// Also pull the latest jobs of every tracked ref
        #[arg(short, long, default_value_t = false)]
        jobs: bool,

        /// Print the snapshot as JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Keep refs up to date on the configured schedules until interrupted
    Run,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(url) = &self.gitlab_url {
            config.gitlab.url.clone_from(url);
        }
        if let Some(token) = &self.token {
            config.gitlab.token = Some(token.clone());
        }
        for name in &self.projects {
            if !config.projects.iter().any(|p| &p.name == name) {
                config.projects.push(ProjectConfig::new(name.as_str()));
            }
        }

        Ok(config)
    }

    fn build_exporter(config: &Config) -> Result<(Exporter, UnboundedReceiver<Task>)> {
        let token = config.gitlab.token.as_deref().map(Token::from);
        let client = GitLabClient::new(
            &config.gitlab.url,
            token,
            config.gitlab.timeout(),
            config.gitlab.max_concurrent_requests,
        )?;
        let (queue, receiver) = PullingQueue::new();
        Ok((Exporter::new(client, Store::new(), queue), receiver))
    }

    fn write_snapshot(&self, refs: &ProjectsRefs) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(refs)?
        } else {
            serde_json::to_string(refs)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Refs written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    async fn execute_discover(
        &self,
        config: &Config,
        projects: &[Project],
        jobs: bool,
        json: bool,
    ) -> Result<()> {
        // No workers here: job pulls requested through the queue are left
        // pending and driven below when asked for.
        let (exporter, _receiver) = Self::build_exporter(config)?;
        let exporter = &exporter;

        let progress = DiscoveryProgress::start(projects.len());
        let outcomes = join_all(projects.iter().map(|project| {
            let progress = &progress;
            async move {
                let outcome = exporter.sync_project_refs(project).await;
                progress.project_done(outcome.is_ok());
                (project, outcome)
            }
        }))
        .await;
        progress.finish();

        let mut failed = 0;
        for (project, outcome) in outcomes {
            match outcome {
                Ok((inserted, retired)) => info!(
                    "Project {}: {inserted} refs tracked, {retired} retired",
                    project.name
                ),
                Err(e) => {
                    warn!("Failed to discover refs of project {}: {e}", project.name);
                    failed += 1;
                }
            }
        }

        if jobs {
            let keys = exporter.store().keys()?;
            let pulls = keys
                .iter()
                .map(|key| async move { (key, exporter.pull_project_ref_jobs(key).await) });
            for (key, outcome) in join_all(pulls).await {
                if let Err(e) = outcome {
                    warn!("Failed to pull jobs of ref {key}: {e}");
                }
            }
        }

        let refs = exporter.store().projects_refs()?;
        if json || self.output.is_some() {
            self.write_snapshot(&refs)?;
        } else {
            print_summary(&refs);
        }

        if failed == projects.len() {
            bail!("Ref discovery failed for every project");
        }
        Ok(())
    }

    async fn execute_run(&self, config: &Config, projects: Vec<Project>) -> Result<()> {
        let (exporter, receiver) = Self::build_exporter(config)?;
        let exporter = Arc::new(exporter);

        info!(
            "Monitoring {} projects with {} workers",
            projects.len(),
            config.pull.workers
        );

        let workers = spawn_workers(
            Arc::clone(&exporter),
            receiver,
            config.pull.workers,
            config.pull.task_timeout(),
        );
        let schedules = spawn_schedules(
            Arc::clone(&exporter),
            Arc::new(projects),
            &config.pull.schedules(),
        );

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        info!("Shutting down");

        for handle in schedules.into_iter().chain(workers) {
            handle.abort();
        }

        if self.output.is_some() {
            self.write_snapshot(&exporter.store().projects_refs()?)?;
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        let projects = config.projects()?;
        if projects.is_empty() {
            bail!("No projects configured: add [[projects]] to the configuration or pass --project");
        }

        match &self.command {
            Commands::Discover { jobs, json } => {
                self.execute_discover(&config, &projects, *jobs, *json)
                    .await
            }
            Commands::Run => self.execute_run(&config, projects).await,
        }
    }
}

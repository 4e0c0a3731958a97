//! `faf-server` command line: run the broker or inspect documents offline

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use faf_core::{sync_file, BrokerConfig, FafBroker};
use faf_dialect::{resolve_agent, translate, AgentSignals, Badge};
use faf_dna::{has_distinction, score, ProjectDna};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("faf-server")
        .version(faf_server::VERSION)
        .about("Project DNA broker: badge, per-agent document and guarded mutations")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Serve the broker over HTTP")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .env("FAF_CONFIG")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("addr")
                        .long("addr")
                        .value_parser(value_parser!(SocketAddr))
                        .help("Listen address, overrides the configuration"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Emit logs as JSON lines"),
                ),
        )
        .subcommand(
            Command::new("score")
                .about("Print the completeness score of a document")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the .faf document"),
                ),
        )
        .subcommand(
            Command::new("translate")
                .about("Print the document as a given agent would receive it")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the .faf document"),
                )
                .arg(
                    Arg::new("agent")
                        .long("agent")
                        .required(true)
                        .help("Agent name, e.g. claude, gemini, jules"),
                ),
        )
        .subcommand(
            Command::new("sync")
                .about("Copy score and tier into a markdown file's front matter")
                .arg(
                    Arg::new("faf")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the .faf document"),
                )
                .arg(
                    Arg::new("markdown")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Markdown file to update"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("serve", sub)) => serve(sub).await,
        Some(("score", sub)) => {
            faf_server::init_tracing(false)?;
            print_score(required_path(sub, "file")?)
        }
        Some(("translate", sub)) => {
            faf_server::init_tracing(false)?;
            let agent = sub
                .get_one::<String>("agent")
                .context("missing --agent")?;
            print_translation(required_path(sub, "file")?, agent)
        }
        Some(("sync", sub)) => {
            faf_server::init_tracing(false)?;
            let faf = required_path(sub, "faf")?;
            let markdown = required_path(sub, "markdown")?;
            let synced = sync_file(faf, markdown)
                .with_context(|| format!("failed to sync {}", markdown.display()))?;
            println!("synced {} at {synced}%", markdown.display());
            Ok(())
        }
        _ => unreachable!("subcommand is required"),
    }
}

fn required_path<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a Path> {
    matches
        .get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing <{name}>"))
}

fn read_dna(path: &Path) -> anyhow::Result<ProjectDna> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ProjectDna::from_yaml(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_score(path: &Path) -> anyhow::Result<()> {
    let dna = read_dna(path)?;
    let badge = Badge::new(score(&dna), has_distinction(&dna));
    println!("{}", badge.display_text());
    Ok(())
}

fn print_translation(path: &Path, agent: &str) -> anyhow::Result<()> {
    let dna = read_dna(path)?;
    let agent = resolve_agent(&AgentSignals::new(Some(agent), None));
    let rendered = translate(&dna, &agent)
        .render()
        .context("failed to render translation")?;
    println!("{rendered}");
    Ok(())
}

async fn serve(matches: &ArgMatches) -> anyhow::Result<()> {
    faf_server::init_tracing(matches.get_flag("json"))?;

    let mut config = BrokerConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("failed to load configuration")?;
    if let Some(addr) = matches.get_one::<SocketAddr>("addr") {
        config.listen_addr = *addr;
    }

    let addr = config.listen_addr;
    let broker = Arc::new(FafBroker::from_config(config).context("failed to build broker")?);

    let api = faf_server::routes(broker).with(warp::trace::request());
    let (bound, server) = warp::serve(api)
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %bound, version = faf_server::VERSION, "faf broker listening");
    server.await;
    tracing::info!("faf broker stopped");
    Ok(())
}

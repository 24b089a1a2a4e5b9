//! doxa CLI: inspect and query a knowledgebase built from a scenario file.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use doxa::engine::{KbConfig, Knowledgebase, Scope};
use doxa::graph::{Certainty, RelationQuery};
use doxa::scenario::Scenario;

#[derive(Parser)]
#[command(name = "doxa", version, about = "Relationship store with per-entity beliefs")]
struct Cli {
    /// Scenario JSON file describing entities, declarations, facts and beliefs.
    #[arg(long, global = true)]
    scenario: Option<PathBuf>,

    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show knowledgebase summary counts.
    Info,

    /// Print the whole knowledgebase as JSON.
    Export,

    /// Find relationships, globally or merged for one entity.
    Find {
        /// Relation name.
        #[arg(long)]
        relation: String,

        /// Required subject.
        #[arg(long)]
        subject: Option<String>,

        /// Required target.
        #[arg(long)]
        target: Option<String>,

        /// Required certainty (1, 0, -1, ...).
        #[arg(long, allow_hyphen_values = true)]
        certainty: Option<i64>,

        /// Search this entity's beliefs merged with the global scope.
        #[arg(long = "as")]
        holder: Option<String>,
    },

    /// Evaluate a belief query for one entity.
    Ask {
        /// Which belief to test.
        #[arg(value_enum)]
        belief: BeliefKind,

        /// The entity whose beliefs are consulted.
        #[arg(long = "as")]
        holder: String,

        subject: String,
        relation: String,
        target: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BeliefKind {
    Knows,
    Suspects,
    Thinks,
    Rejects,
    Certain,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => KbConfig::load(path)?,
        None => KbConfig::default(),
    };
    let kb = Knowledgebase::new(config);
    if let Some(ref path) = cli.scenario {
        let report = Scenario::load(path)?.apply(&kb)?;
        tracing::info!(path = %path.display(), %report, "scenario loaded");
    }

    match cli.command {
        Commands::Info => {
            println!("{}", kb.info());
        }

        Commands::Export => {
            let json = serde_json::to_string_pretty(&kb.snapshot()).into_diagnostic()?;
            println!("{json}");
        }

        Commands::Find {
            relation,
            subject,
            target,
            certainty,
            holder,
        } => {
            let query = RelationQuery {
                relation,
                subject,
                target,
                certainty: certainty.map(Certainty),
            };
            let found = match holder {
                Some(ref name) => kb.entity(name)?.find_relationships(&query),
                None => kb.find_relationships(&query, Scope::Global),
            };
            if found.is_empty() {
                println!("No matching relationships.");
            } else {
                println!("Relationships ({}):", found.len());
                for t in &found {
                    println!(
                        "  \"{}\" -{}-> \"{}\" [{}]",
                        t.subject, query.relation, t.target, t.certainty
                    );
                }
            }
        }

        Commands::Ask {
            belief,
            holder,
            subject,
            relation,
            target,
        } => {
            let entity = kb.entity(&holder)?;
            let (s, r, t) = (subject.as_str(), relation.as_str(), target.as_str());
            let answer = match belief {
                BeliefKind::Knows => entity.knows(s, r, t),
                BeliefKind::Suspects => entity.suspects(s, r, t),
                BeliefKind::Thinks => entity.thinks(s, r, t),
                BeliefKind::Rejects => entity.rejects(s, r, t),
                BeliefKind::Certain => entity.certain(s, r, t),
            };
            println!("{answer}");
        }
    }

    Ok(())
}

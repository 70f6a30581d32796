use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use workflow_graph::config::app_data_dir;
use workflow_graph::{
    AttributeRef, EditorConfig, EditorSession, HeadlessSurface, LoadReport, NodeCategory,
    PortKind, RenderSurface, SurfaceEvent, WorkflowDocument,
};

/// Horizontal gap between nodes laid out by `new`
const NODE_SPACING: f64 = 250.0;

/// Log filter when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info";

/// Palette filter for clap
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CategoryCli {
    Nodes,
    Programs,
}

impl From<CategoryCli> for NodeCategory {
    fn from(category: CategoryCli) -> Self {
        match category {
            CategoryCli::Nodes => NodeCategory::GraphNode,
            CategoryCli::Programs => NodeCategory::LauncherCard,
        }
    }
}

/// Inspect and edit Arquiteto workflow documents
#[derive(Parser, Debug)]
#[command(name = "workflowctl", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to <data dir>/arquiteto/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the workflow directory from the config
    #[arg(short, long)]
    workflows_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored workflows
    List,
    /// Load a stored workflow and print its graph
    Show { name: String },
    /// Delete a stored workflow
    Delete { name: String },
    /// Validate a document file and report what would be skipped on load
    Check { path: PathBuf },
    /// List node types from the catalog
    Types {
        #[arg(short = 'C', long, value_enum)]
        category: Option<CategoryCli>,
    },
    /// Create a workflow from node types, chaining each node to the next
    New {
        name: String,
        #[arg(required = true)]
        types: Vec<String>,
        /// Do not link consecutive nodes
        #[arg(long)]
        no_links: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.workflows_dir)?;
    let mut out = io::stdout().lock();
    run(cli.command, config, &mut out)
}

fn load_config(path: Option<&Path>, workflows_dir: Option<PathBuf>) -> Result<EditorConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| app_data_dir().map(|dir| dir.join("config.json")));
    let mut config = match path {
        Some(path) => EditorConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if let Some(dir) = workflows_dir {
        config.workflows_dir = dir;
    }
    Ok(config)
}

fn run(command: Command, config: EditorConfig, out: &mut impl Write) -> Result<()> {
    let mut session = EditorSession::new(config, HeadlessSurface::new())
        .context("Failed to start editor session")?;

    match command {
        Command::List => list(&session, out),
        Command::Show { name } => {
            let report = session
                .open(&name)
                .with_context(|| format!("Failed to open workflow '{}'", name))?;
            write!(out, "{}", session.tracker().summary())?;
            print_skips(&report, out)
        }
        Command::Delete { name } => {
            if !session.delete_workflow(&name) {
                bail!("Workflow '{}' was not deleted", name);
            }
            writeln!(out, "Deleted '{}'", name)?;
            Ok(())
        }
        Command::Check { path } => check(&mut session, &path, out),
        Command::Types { category } => {
            let registry = session.registry();
            let keys = match category {
                Some(category) => registry.list_keys(category.into()),
                None => registry.all_keys(),
            };
            for key in keys {
                if let Some(node_type) = registry.get(key) {
                    writeln!(out, "{:<14} {}", key, node_type.label)?;
                }
            }
            Ok(())
        }
        Command::New {
            name,
            types,
            no_links,
        } => {
            build_chain(&mut session, &types, !no_links)?;
            session
                .save_as(&name)
                .with_context(|| format!("Failed to save workflow '{}'", name))?;
            writeln!(
                out,
                "Saved '{}' ({} nodes, {} links)",
                name,
                session.tracker().node_count(),
                session.tracker().link_count()
            )?;
            Ok(())
        }
    }
}

fn list(session: &EditorSession<HeadlessSurface>, out: &mut impl Write) -> Result<()> {
    let summaries = session.list_workflows();
    if summaries.is_empty() {
        writeln!(out, "No workflows in {}", session.store().dir().display())?;
        return Ok(());
    }
    for summary in summaries {
        writeln!(
            out,
            "{:<30} {:>3} nodes {:>3} links  updated {}",
            summary.name, summary.node_count, summary.link_count, summary.updated_at
        )?;
    }
    Ok(())
}

fn check(session: &mut EditorSession<HeadlessSurface>, path: &Path, out: &mut impl Write) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document = WorkflowDocument::from_json_str(&content)
        .with_context(|| format!("{} is not a workflow document", path.display()))?;
    let report = session.open_document(&document)?;

    writeln!(
        out,
        "'{}': {} nodes, {} links loaded",
        report.name, report.nodes_loaded, report.links_loaded
    )?;
    print_skips(&report, out)
}

fn print_skips(report: &LoadReport, out: &mut impl Write) -> Result<()> {
    for skipped in &report.skipped_nodes {
        writeln!(
            out,
            "skipped node {} ({}): {}",
            skipped.node_id, skipped.node_type, skipped.reason
        )?;
    }
    for skipped in &report.skipped_links {
        writeln!(out, "skipped link {}: {}", skipped.link_id, skipped.reason)?;
    }
    Ok(())
}

/// Add one node per type left to right, optionally linking each to the next
fn build_chain(session: &mut EditorSession<HeadlessSurface>, types: &[String], link: bool) -> Result<()> {
    let mut previous: Option<String> = None;
    for (i, type_key) in types.iter().enumerate() {
        let position = (100.0 + NODE_SPACING * i as f64, 100.0);
        let node_id = session.add_node(type_key, Some(position))?;

        if let (true, Some(prev)) = (link, previous.as_deref()) {
            let from = session.surface().find_attribute(&AttributeRef::new(prev, PortKind::Output));
            let to = session.surface().find_attribute(&AttributeRef::new(node_id.as_str(), PortKind::Input));
            match (from, to) {
                (Some(from_attribute), Some(to_attribute)) => {
                    session.handle_event(SurfaceEvent::LinkConnected {
                        from_attribute,
                        to_attribute,
                    })?;
                }
                _ => log::warn!("Cannot link {} to {}: missing port", prev, node_id),
            }
        }
        previous = Some(node_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> EditorConfig {
        EditorConfig {
            workflows_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    fn run_to_string(command: Command, dir: &TempDir) -> Result<String> {
        let mut out = Vec::new();
        run(command, config(dir), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn new_command(name: &str, types: &[&str]) -> Command {
        Command::New {
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
            no_links: false,
        }
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["workflowctl", "-w", "/tmp/flows", "new", "demo", "start", "launcher"])
            .unwrap();
        assert_eq!(cli.workflows_dir, Some(PathBuf::from("/tmp/flows")));
        assert!(matches!(cli.command, Command::New { ref types, .. } if types.len() == 2));

        assert!(Cli::try_parse_from(["workflowctl", "new", "demo"]).is_err());
        assert!(Cli::try_parse_from(["workflowctl", "types", "-C", "programs"]).is_ok());
    }

    #[test]
    fn test_new_then_list_and_show() {
        let dir = TempDir::new().unwrap();

        let saved = run_to_string(new_command("demo", &["start", "launcher", "workspace"]), &dir).unwrap();
        assert!(saved.contains("3 nodes, 2 links"));

        let listing = run_to_string(Command::List, &dir).unwrap();
        assert!(listing.starts_with("demo"));

        let shown = run_to_string(Command::Show { name: "demo".to_string() }, &dir).unwrap();
        assert!(shown.contains("workflow: demo"));
        assert!(shown.contains("unsaved changes: false"));
        assert!(shown.contains("links: 2"));
    }

    #[test]
    fn test_new_skips_links_without_ports() {
        let dir = TempDir::new().unwrap();
        // start has no input, so nothing links into it
        let saved = run_to_string(new_command("chain", &["launcher", "start", "zed"]), &dir).unwrap();
        assert!(saved.contains("3 nodes, 1 links"));
    }

    #[test]
    fn test_new_rejects_unknown_type() {
        let dir = TempDir::new().unwrap();
        assert!(run_to_string(new_command("bad", &["start", "teleporter"]), &dir).is_err());
        assert!(run_to_string(Command::List, &dir).unwrap().starts_with("No workflows"));
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        run_to_string(new_command("gone", &["start"]), &dir).unwrap();

        assert!(run_to_string(Command::Delete { name: "gone".to_string() }, &dir).is_ok());
        assert!(run_to_string(Command::Delete { name: "gone".to_string() }, &dir).is_err());
    }

    #[test]
    fn test_check_reports_skips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("incoming.json");
        std::fs::write(
            &path,
            r#"{
                "version": "1.0",
                "name": "incoming",
                "nodes": [
                    { "id": "start_00000001", "type": "start", "pos": [0, 0], "data": {} },
                    { "id": "warp_00000002", "type": "warp", "pos": [0, 0], "data": {} }
                ],
                "links": [
                    { "id": "7", "from_attr": "start_00000001_output", "to_attr": "warp_00000002_input" }
                ]
            }"#,
        )
        .unwrap();

        let report = run_to_string(Command::Check { path: path.clone() }, &dir).unwrap();
        assert!(report.contains("1 nodes, 0 links loaded"));
        assert!(report.contains("skipped node warp_00000002"));
        assert!(report.contains("skipped link 7"));

        std::fs::write(&path, r#"{ "name": "nope" }"#).unwrap();
        assert!(run_to_string(Command::Check { path }, &dir).is_err());
    }

    #[test]
    fn test_default_log_filter_shows_info() {
        let level: log::LevelFilter = DEFAULT_LOG_FILTER.parse().unwrap();
        assert_eq!(level, log::LevelFilter::Info);
    }

    #[test]
    fn test_types_filter() {
        let dir = TempDir::new().unwrap();
        let programs = run_to_string(
            Command::Types {
                category: Some(CategoryCli::Programs),
            },
            &dir,
        )
        .unwrap();
        assert!(programs.contains("ghostty"));
        assert!(!programs.contains("start"));
    }
}

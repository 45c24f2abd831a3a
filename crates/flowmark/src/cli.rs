//! Command line surface: argument parsing and non-interactive subcommands.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::joined::{JoinedStore, joined_snippet, subflow_snippet};
use crate::app::registry::{AppRegistry, ResolvedStep};
use crate::app::search::{SearchHit, SearchQuery, search_flows};
use crate::app::tree::{FlowTreeProvider, TreeNode};
use crate::app::workspace::Workspace;
use crate::domain::model::{FlowKind, SubflowRef};
use crate::infra::config::Config;
use crate::infra::git;
use crate::infra::logging::{self, LogTarget};
use crate::ui::app::UiApp;

#[derive(Debug, Parser)]
#[command(name = "flowmark", author, version, about = "Browse bookmarked code flows of a monorepo")]
pub struct Cli {
    /// Monorepo root; defaults to the enclosing git work tree.
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive flow browser (default)
    Tui {
        #[arg(long)]
        app: Option<String>,
    },
    /// List apps of the workspace
    Apps {
        /// Only apps that have no bookmark file yet
        #[arg(long)]
        without_bookmarks: bool,
    },
    /// Print the flow tree of an app
    Tree {
        #[arg(long)]
        app: String,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the steps of a flow
    Flow {
        #[arg(long)]
        app: String,
        name: String,
        #[arg(long)]
        joined: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print the subflows of a joined flow
    Joined {
        #[arg(long)]
        app: String,
        name: String,
    },
    /// Print the JSON snippet referencing a flow
    Snippet {
        #[arg(long)]
        app: String,
        name: String,
        #[arg(long)]
        joined: bool,
    },
    /// Search the bookmark and joined flow files of every app for any of the keywords
    Search {
        #[arg(required = true, value_name = "KEYWORD")]
        keywords: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Create the joined flow file of an app if needed and print its path
    ManageJoined {
        #[arg(long)]
        app: String,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

/// Parse arguments and run the selected command.
pub fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Command::Tui { app: None });

    if let Command::Completions { shell } = command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "flowmark", &mut io::stdout());
        return Ok(());
    }

    let root = resolve_root(cli.root)?;
    let config = Config::load(&root)?;

    if let Command::Tui { app } = &command {
        logging::init(LogTarget::File(root.join(&config.defaults.log_file)), cli.verbose)?;
        return UiApp::new(root, config, app.clone()).run();
    }

    logging::init(LogTarget::Stderr, cli.verbose)?;
    let workspace = Workspace::discover(&root, &config.workspace)?;
    let registry = AppRegistry::new(workspace);
    let mut out = io::stdout().lock();

    match command {
        Command::Apps { without_bookmarks } => {
            let names = if without_bookmarks {
                registry.workspace().apps_without_bookmarks()
            } else {
                registry.workspace().apps_with_bookmarks()
            };
            for name in names {
                writeln!(out, "{name}")?;
            }
        }
        Command::Tree { app, filter, json } => {
            let mut provider = FlowTreeProvider::new(registry.load_app(&app)?);
            provider.set_filter(filter.as_deref());
            if json {
                serde_json::to_writer_pretty(&mut out, provider.forest())?;
                writeln!(out)?;
            } else {
                write!(out, "{}", render_tree(provider.forest()))?;
            }
        }
        Command::Flow {
            app,
            name,
            joined,
            json,
        } => {
            let steps = registry.resolve_flow(&app, &name, kind(joined))?;
            if json {
                serde_json::to_writer_pretty(&mut out, &steps)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", render_steps(&steps))?;
            }
        }
        Command::Joined { app, name } => {
            for subflow in registry.catalog(&app)?.get_joined_flow(&name)? {
                writeln!(out, "{} : {}", subflow.app, subflow.flow)?;
            }
        }
        Command::Snippet { app, name, joined } => {
            let snippet = if joined {
                joined_snippet(&registry.catalog(&app)?.get_joined_flow(&name)?)
            } else {
                subflow_snippet(&SubflowRef::new(app.as_str(), name.as_str()))
            };
            writeln!(out, "{snippet}")?;
        }
        Command::Search { keywords, json } => {
            let query = SearchQuery::new(&keywords);
            let hits = search_flows(registry.workspace().root(), &config.workspace, &query)?;
            if json {
                serde_json::to_writer_pretty(&mut out, &hits)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", render_hits(&hits))?;
            }
        }
        Command::ManageJoined { app } => {
            let entry = registry
                .workspace()
                .app(&app)
                .ok_or_else(|| anyhow!("unknown app {app}"))?;
            let store = JoinedStore::new(&entry.joined_file);
            let path = store.ensure_exists()?;
            writeln!(out, "{}", path.display())?;
        }
        // Handled before the workspace is discovered.
        Command::Tui { .. } | Command::Completions { .. } => {}
    }
    Ok(())
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => {
            let cwd = std::env::current_dir().context("unable to determine working directory")?;
            Ok(git::workspace_root(&cwd))
        }
    }
}

fn kind(joined: bool) -> FlowKind {
    if joined {
        FlowKind::Joined
    } else {
        FlowKind::Basic
    }
}

/// Indented text rendering of a forest, every node expanded.
pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, 0);
    }
    out
}

fn write_node(out: &mut String, node: &TreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = match node {
        TreeNode::Subflow {
            label, description, ..
        } => writeln!(out, "{indent}{label} ({description})"),
        _ => writeln!(out, "{indent}{}", node.label()),
    };
    for child in node.children().unwrap_or_default() {
        write_node(out, child, depth + 1);
    }
}

/// One line per step: `app/flow #index  location  description`, then the bookmarked text.
pub fn render_steps(steps: &[ResolvedStep]) -> String {
    let mut out = String::new();
    for resolved in steps {
        let step = &resolved.step;
        let _ = writeln!(
            out,
            "{}/{} #{}  {}  {}",
            resolved.app,
            resolved.flow,
            step.index,
            location(&step.path, &step.line_number),
            step.description
        );
        if !step.text.is_empty() {
            let _ = writeln!(out, "    {}", step.text);
        }
    }
    out
}

/// One line per hit: `kind app/flow  location  description`.
pub fn render_hits(hits: &[SearchHit]) -> String {
    let mut out = String::new();
    for hit in hits {
        let kind = match hit.kind {
            FlowKind::Basic => "basic ",
            FlowKind::Joined => "joined",
        };
        let _ = writeln!(
            out,
            "{kind} {}/{}  {}  {}",
            hit.app,
            hit.flow,
            location(&hit.step.path, &hit.step.line_number),
            hit.step.description
        );
    }
    out
}

fn location(path: &str, line: &str) -> String {
    if path.is_empty() {
        return format!("-:{line}");
    }
    format!("{}:{line}", Path::new(path).display())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::app::catalog::CatalogSnapshot;
    use crate::app::tree::FlowSource;
    use crate::domain::model::{BookmarkStep, Flow};

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["flowmark", "--root", "/repo", "tree", "--app", "cart", "--json"])
            .unwrap();
        assert_eq!(cli.root.as_deref(), Some(Path::new("/repo")));
        assert!(matches!(
            cli.command,
            Some(Command::Tree { ref app, filter: None, json: true }) if app == "cart"
        ));

        let cli = Cli::try_parse_from(["flowmark"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn renders_tree_text() {
        let mut snapshot = CatalogSnapshot::default();
        snapshot.flows.insert("Login".into(), Flow::default());
        snapshot
            .joined
            .insert("Checkout".into(), vec![SubflowRef::new("pay", "Pay")]);
        let provider = FlowTreeProvider::new(FlowSource::new("shop", Arc::new(snapshot)));

        assert_eq!(
            render_tree(provider.forest()),
            "Basic Flows\n  Login\nJoined Flows\n  Checkout\n    Pay (pay)\n"
        );
    }

    #[test]
    fn parses_search_keywords() {
        let cli = Cli::try_parse_from(["flowmark", "search", "pay", "refund"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Search { ref keywords, json: false }) if keywords == &["pay", "refund"]
        ));
        assert!(Cli::try_parse_from(["flowmark", "search"]).is_err());
    }

    #[test]
    fn renders_search_hits() {
        let hit = SearchHit {
            app: "cart".into(),
            flow: "Checkout".into(),
            kind: FlowKind::Joined,
            step: BookmarkStep {
                code: "cart".into(),
                description: "cart/AddItem, pay/Pay".into(),
                text: String::new(),
                line_number: "3".into(),
                path: "packages/apps/cart/joinedBookmarks.json".into(),
                file_name: "packages/apps/cart".into(),
                index: 0,
            },
        };
        assert_eq!(
            render_hits(&[hit]),
            "joined cart/Checkout  packages/apps/cart/joinedBookmarks.json:3  cart/AddItem, pay/Pay\n"
        );
    }

    #[test]
    fn renders_not_found_step() {
        let steps = vec![ResolvedStep {
            app: "cart".into(),
            flow: "Nope".into(),
            step: BookmarkStep::not_found(),
        }];
        let text = render_steps(&steps);
        assert!(text.starts_with("cart/Nope #0  -:0  --- FLOW_NOT_FOUND ---"));
    }
}

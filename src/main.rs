use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use editor_state::node::NodeRef;
use editor_state::{
    Config, Editor, EditorState, ExportFormat, Exporter, FileStore, Restored, codec, import,
};

#[derive(Parser)]
#[command(name = "editor-state")]
#[command(about = "Inspect, convert and store Lexical editor states")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "editor-state.toml")]
    config: PathBuf,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a serialized editor state
    Export {
        /// Input JSON file
        input: PathBuf,

        #[arg(short, long, value_enum, default_value = "html")]
        format: ExportFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert Markdown into a serialized editor state
    Import {
        /// Input Markdown file
        input: PathBuf,

        /// Output JSON file (defaults to input name with .json extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },
    /// Print the node hierarchy of a serialized editor state
    Tree { input: PathBuf },
    /// List the available export formats
    Formats,
    /// Validate a serialized editor state and persist it in the store
    Save {
        input: PathBuf,

        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long)]
        key: Option<String>,
    },
    /// Restore the stored editor state and export it
    Load {
        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long)]
        key: Option<String>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config);
    let exporter = Exporter::new(&config.export());

    match cli.command {
        Command::Export {
            input,
            format,
            output,
        } => {
            let state = read_state(&input)?;
            let rendered = exporter.export(&state, format)?;
            write_output(output.as_deref(), &rendered)?;
        }
        Command::Import {
            input,
            output,
            pretty,
        } => {
            let markdown = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let state = import::from_markdown(&markdown)?;
            let json = if pretty {
                codec::encode_pretty(&state)?
            } else {
                codec::encode(&state)?
            };
            let output = output.unwrap_or_else(|| input.with_extension("json"));
            fs::write(&output, json)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Created {}", output.display());
        }
        Command::Tree { input } => {
            let state = read_state(&input)?;
            print!("{}", render_tree(&state));
        }
        Command::Formats => {
            for format in exporter.formats() {
                println!("{}", format.title());
            }
        }
        Command::Save { input, store, key } => {
            let state = read_state(&input)?;
            let store = FileStore::new(store.unwrap_or(config.store.dir));
            let key = key.unwrap_or(config.store.key);
            Editor::new(state)
                .persist(&store, &key)
                .with_context(|| format!("Failed to save {key}"))?;
            println!("Saved {key} to {}", store.dir().display());
        }
        Command::Load { store, key, format } => {
            let store = FileStore::new(store.unwrap_or(config.store.dir));
            let key = key.unwrap_or(config.store.key);
            let editor = Editor::default();
            let restored = editor
                .restore(&store, &key)
                .with_context(|| format!("Failed to load {key}"))?;
            if restored == Restored::Absent {
                tracing::info!(key = %key, "Nothing stored; printing an empty document");
            }
            let rendered = exporter.export(&editor.editor_state(), format)?;
            write_output(None, &rendered)?;
        }
    }

    Ok(())
}

fn read_state(path: &Path) -> Result<EditorState> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    codec::decode(&json).with_context(|| format!("Invalid editor state in {}", path.display()))
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

/// One line per node, indented by depth.
fn render_tree(state: &EditorState) -> String {
    let mut out = String::new();
    let mut nodes = state.traverse();
    while let Some(node) = nodes.next() {
        out.push_str(&"  ".repeat(nodes.depth()));
        out.push_str(node.kind().as_str());
        if let NodeRef::Node(editor_state::Node::Text(text)) = node {
            out.push_str(&format!(" {:?}", text.text));
        }
        out.push('\n');
    }
    out
}

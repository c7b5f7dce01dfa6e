use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use quill_common::QuillConfig;
use quill_common::telemetry::{self, TelemetryConfig};
use quill_editor::builtin_samples;
use quill_renderer::{BuiltinModules, DEFAULT_EXPORT_TITLE, Processor, standalone_document};
use quill_storage::{Persistence, SampleLibrary, StorageSelector};

#[derive(Parser)]
#[command(version, about = "Quill - live markdown preview with local persistence", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "QUILL_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to sanitized HTML
    Render {
        /// Markdown file, or `-` for stdin
        file: PathBuf,

        /// Write the HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Wrap the output in a complete HTML page
        #[arg(long)]
        standalone: bool,
    },
    /// Read or write a stored document
    Document {
        #[command(subcommand)]
        command: DocumentCommand,
    },
    /// Read or write a stored setting
    Setting {
        #[command(subcommand)]
        command: SettingCommand,
    },
    /// List the built-in samples
    Samples,
    /// Show which storage tier is in use
    Backend,
}

#[derive(Subcommand)]
enum DocumentCommand {
    /// Print a document's markdown
    Show {
        #[arg(long, default_value_t = 1)]
        id: i64,
    },
    /// Store a markdown file as a document
    Save {
        /// Markdown file, or `-` for stdin
        file: PathBuf,

        #[arg(long, default_value_t = 1)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum SettingCommand {
    /// Print a setting's value
    Get { key: String },
    /// Set a setting's value
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    telemetry::init(TelemetryConfig::from_env("quill-cli"));

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.db)?;

    match cli.command {
        Commands::Render {
            file,
            output,
            standalone,
        } => render(&config, &file, output.as_deref(), standalone).await?,
        Commands::Document { command } => {
            let persistence = persistence(&config);
            match command {
                DocumentCommand::Show { id } => match persistence.get_document(id).await {
                    Some(doc) => println!("{}", doc.content),
                    None => miette::bail!("no document with id {id}"),
                },
                DocumentCommand::Save { file, id } => {
                    let content = read_input(&file)?;
                    persistence.save_document(id, content).await;
                    println!("Saved document {id}");
                }
            }
        }
        Commands::Setting { command } => {
            let persistence = persistence(&config);
            match command {
                SettingCommand::Get { key } => match persistence.get_setting(&key).await {
                    Some(value) => println!("{value}"),
                    None => miette::bail!("setting `{key}` is not set"),
                },
                SettingCommand::Set { key, value } => {
                    persistence.save_setting(key.clone(), value).await;
                    println!("Saved setting {key}");
                }
            }
        }
        Commands::Samples => {
            let library = SampleLibrary::new(persistence(&config), Arc::new(builtin_samples()));
            for info in library.samples() {
                println!("{}\t{}", info.key, info.title);
            }
        }
        Commands::Backend => {
            let persistence = persistence(&config);
            println!("{}", persistence.backend_kind().await);
        }
    }

    Ok(())
}

/// Config file (or environment), then the `--db` override, then a per-user
/// database when nothing says where storage lives.
fn load_config(path: Option<&Path>, db: Option<PathBuf>) -> Result<QuillConfig> {
    let mut config = match path {
        Some(path) => QuillConfig::load(path)?.with_env_overrides()?,
        None => QuillConfig::from_env()?,
    };

    if let Some(db) = db {
        config.storage.database_path = Some(db);
    }
    if config.storage.database_path.is_none() && config.storage.flat_path.is_none() {
        match dirs::data_dir() {
            Some(dir) => {
                config.storage.database_path = Some(dir.join("quill").join("quill.sqlite"))
            }
            None => tracing::warn!("no data directory, storage will not outlive this run"),
        }
    }
    Ok(config)
}

fn persistence(config: &QuillConfig) -> Persistence {
    Persistence::new(Arc::new(StorageSelector::from_config(&config.storage)))
}

fn read_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file).into_diagnostic()
    }
}

async fn render(
    config: &QuillConfig,
    file: &Path,
    output: Option<&Path>,
    standalone: bool,
) -> Result<()> {
    let markdown = read_input(file)?;
    let processor = Processor::new(BuiltinModules::new(config.render.clone()));
    let html = processor.process(&markdown).await?;

    let html = if standalone {
        let title = file
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| *s != "-")
            .unwrap_or(DEFAULT_EXPORT_TITLE);
        standalone_document(&html, title).ok_or_else(|| miette::miette!("nothing to export"))?
    } else {
        html
    };

    match output {
        Some(path) => {
            std::fs::write(path, html).into_diagnostic()?;
            tracing::info!(path = %path.display(), "wrote html");
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn init_miette() {
    let installed = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    if installed.is_err() {
        eprintln!("couldn't set the miette hook");
    }
    miette::set_panic_hook();
}

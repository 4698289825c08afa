mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use covergen_core::project::BookInfo;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "covergen",
    about = "Resumable book cover generation: research, strategy, prompts, images, report",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from covergen.yaml or projects/)
    #[arg(long, global = true, env = "COVERGEN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project from book details
    New {
        title: String,
        author: String,
        genre: String,
        description: String,
    },

    /// Recover an interrupted step and run the remaining pipeline
    Resume {
        slug: String,
        /// Run only the next pending step
        #[arg(long)]
        once: bool,
    },

    /// Run a single step (default: the next pending one)
    Step {
        slug: String,
        /// Step name ("Image Generation") or alias (image_generation)
        step: Option<String>,
        /// Invalidate the step and everything after it, then run it again
        #[arg(long)]
        rerun: bool,
    },

    /// List projects, most recently updated first
    List,

    /// Show a project's progress
    Status { slug: String },

    /// Show the pipeline steps in order
    Steps,

    /// Start the HTTP API
    Serve {
        /// Port to listen on (default: server.port from covergen.yaml; 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,

        /// Open a browser once listening
        #[arg(long)]
        open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } | Commands::Resume { .. } | Commands::Step { .. } => {
            tracing::Level::INFO
        }
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::New {
            title,
            author,
            genre,
            description,
        } => cmd::project::new(
            &root,
            BookInfo::new(title, author, genre, description),
            cli.json,
        ),
        Commands::Resume { slug, once } => cmd::run::resume(&root, &slug, once, cli.json),
        Commands::Step { slug, step, rerun } => {
            cmd::run::step(&root, &slug, step.as_deref(), rerun, cli.json)
        }
        Commands::List => cmd::project::list(&root, cli.json),
        Commands::Status { slug } => cmd::project::status(&root, &slug, cli.json),
        Commands::Steps => cmd::project::steps(&root, cli.json),
        Commands::Serve { port, open } => cmd::serve::run(&root, port, open),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

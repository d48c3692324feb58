//! sassproc CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use sassproc_templates::Engine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sassproc")]
#[command(version)]
#[command(about = "Compile SASS/SCSS stylesheets for static-asset pipelines", long_about = None)]
struct Cli {
    /// Settings file (defaults to the nearest sassproc.yml above the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every stylesheet referenced from templates and source files
    Compilescss {
        /// Remove previously generated CSS instead of compiling
        #[arg(long)]
        delete_files: bool,

        /// Write CSS and source maps through the configured storage instead
        /// of next to each source
        #[arg(long)]
        use_processor_root: bool,

        /// Template language to scan with (tags, expressions); repeat to scan
        /// with both
        #[arg(long = "engine", value_name = "ENGINE", default_value = "tags")]
        engines: Vec<Engine>,

        /// Override the configured numeric precision
        #[arg(long)]
        precision: Option<u32>,
    },

    /// Print the public URL of a stylesheet, compiling it if needed
    Resolve {
        /// Logical path, e.g. app/css/main.scss
        path: String,
    },

    /// Render a template and print the result
    Render {
        /// Template name, relative to a template directory
        template: String,

        /// Template language
        #[arg(long, default_value = "tags")]
        engine: Engine,

        /// Context variable (KEY=VALUE; JSON values are decoded)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// Print the source file a logical path resolves to
    Findstatic {
        /// Logical path, e.g. app/css/main.scss
        path: String,
    },
}

fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "sassproc=warn",
        (false, 0) => "sassproc=info",
        (false, 1) => "sassproc=debug",
        (false, _) => "sassproc=trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; command output goes to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(cli.verbose, cli.quiet).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Compilescss {
            delete_files,
            use_processor_root,
            engines,
            precision,
        } => commands::compilescss::execute(commands::compilescss::CompileScssArgs {
            config,
            delete_files,
            use_processor_root,
            engines,
            precision,
        }),
        Commands::Resolve { path } => commands::resolve::execute(config, &path),
        Commands::Render {
            template,
            engine,
            vars,
        } => commands::render::execute(config, &template, engine, &vars),
        Commands::Findstatic { path } => commands::findstatic::execute(config, &path),
    }
}

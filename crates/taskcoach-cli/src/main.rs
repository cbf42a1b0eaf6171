//! taskcoach CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "taskcoach",
    version,
    about = "Task coaching: quizzes, help and mastery tracking"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that touches the pipeline.
#[derive(Args, Clone)]
pub struct CommonArgs {
    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the mastery store (overrides `data_dir` in config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Provider to use (overrides `default_provider` in config)
    #[arg(long)]
    provider: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a task and produce a quiz or help
    Process {
        /// Task title
        #[arg(long)]
        title: String,

        /// Task description
        #[arg(long, default_value = "")]
        description: String,

        /// Task category
        #[arg(long, default_value = "")]
        category: String,

        /// Resource the user is working from
        #[arg(long)]
        context_url: Option<String>,

        /// JSON file with a free-form user profile
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Save the result as a session file for `submit`
        #[arg(long)]
        save: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Grade answers to a saved quiz session
    Submit {
        /// Session file written by `process --save`
        #[arg(long)]
        session: PathBuf,

        /// Comma-separated 0-based answers; `-` skips a question (e.g. "0,2,-,1")
        #[arg(long)]
        answers: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Check whether contact names are plausible for a saved session's task
    VerifyNames {
        /// Session file written by `process --save`
        #[arg(long)]
        session: PathBuf,

        /// Comma-separated names of the people contacted
        #[arg(long)]
        names: String,

        /// Verdict to report when the check itself fails
        #[arg(long, value_enum, default_value = "trust")]
        on_failure: commands::verify::OnFailure,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show mastery per topic and recent attempts
    Mastery {
        /// Number of recent attempts to list
        #[arg(long, default_value = "5")]
        history: usize,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Suggest what to work on next
    Recommend {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config
    Init,
}

#[tokio::main]
async fn main() {
    // stdout carries JSON; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taskcoach_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            title,
            description,
            category,
            context_url,
            profile,
            save,
            common,
        } => {
            commands::process::execute(
                title,
                description,
                category,
                context_url,
                profile,
                save,
                common,
            )
            .await
        }
        Commands::Submit {
            session,
            answers,
            common,
        } => commands::submit::execute(session, answers, common).await,
        Commands::VerifyNames {
            session,
            names,
            on_failure,
            common,
        } => commands::verify::execute(session, names, on_failure, common).await,
        Commands::Mastery { history, common } => {
            commands::mastery::execute(history, common).await
        }
        Commands::Recommend { common } => commands::recommend::execute(common).await,
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

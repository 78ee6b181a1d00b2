mod cmd;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rollout",
    about = "Render, commit, and apply per-application Kubernetes manifests",
    disable_version_flag = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll out one application version into a namespace
    Deploy(cmd::deploy::DeployCmd),
}

fn main() {
    let cli = Cli::parse();

    let Commands::Deploy(ref args) = cli.command;
    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Deploy(args) => cmd::deploy::run(args),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

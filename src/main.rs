use anyhow::Context;
use clap::Parser;
use mapmirror::{Cli, MirrorError, OutputFormatter, OutputMode, SourceMirror, UserFriendlyError};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let exit_code = run(&cli).await;
    process::exit(exit_code);
}

/// RUST_LOG wins over the verbosity flags. Logs go to stderr so stdout
/// stays clean for `--output-format json`.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> i32 {
    if cli.generate_config {
        return handle_generate_config(cli);
    }

    let mirror = match SourceMirror::from_cli(cli) {
        Ok(mirror) => mirror,
        Err(e) => {
            print_startup_error(cli, &e);
            return exit_code_for(&e);
        }
    };

    if mirror.is_dry_run() {
        mirror
            .output_formatter()
            .info("DRY RUN MODE - the mirror and report files will not be touched");
    }

    match mirror.run().await {
        Ok(summary) => {
            mirror.output_formatter().print_run_summary(&summary);
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            mirror.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &MirrorError) -> i32 {
    match error {
        MirrorError::Config { .. } | MirrorError::InvalidUrl { .. } => 2,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("mapmirror.toml"));

    let result = SourceMirror::generate_sample_config(&config_path)
        .with_context(|| format!("Failed to generate configuration file {}", config_path.display()));

    match result {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path.display());
            println!("\nTo use this configuration:");
            println!("  mapmirror --config {}", config_path.display());
            println!("\nSet MAPMIRROR_TOKEN (or pass --token) for authenticated hosts.");
            0
        }
        Err(e) => {
            eprintln!("{:#}", e);
            1
        }
    }
}

fn print_startup_error(cli: &Cli, error: &MirrorError) {
    let mode = OutputMode::from_string(&format!("{:?}", cli.output_format));
    let formatter = OutputFormatter::new(mode, 0, false);
    formatter.print_user_friendly_error(error);
}

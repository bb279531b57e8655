use clap::Parser;
use serverless_functions_operato_rs::{
    cli::{Cli, Commands, ConfigCommands, CrdCommands, RunCommands},
    consts::{DISPLAY_NAME, PKG_VERSION},
    main_actions::*,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var(
            "RUST_LOG",
            "serverless_functions_operato_rs=trace,tower_http=off,hyper=off",
        );
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_level(true)
        .with_ansi(true)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    tracing::info!(version = PKG_VERSION, "{DISPLAY_NAME}");

    match cli.command {
        Commands::Run { command } => match command {
            RunCommands::Webhook {
                address,
                tls_cert,
                tls_key,
                config,
                synthesize_git_repositories,
            } => {
                run_webhook(address, tls_cert, tls_key, config, synthesize_git_repositories).await?
            }
            RunCommands::Controller { config } => run_controller(config).await?,
        },
        Commands::Crd { command } => match command {
            CrdCommands::Print { webhook } => print_crds(webhook)?,
            CrdCommands::Write { file, webhook } => write_crds_to_file(file, webhook).await?,
            CrdCommands::Install { webhook } => install_crds(webhook).await?,
            CrdCommands::Uninstall {} => uninstall_crds().await?,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Print { config } => print_config(config).await?,
        },
    }

    Ok(())
}

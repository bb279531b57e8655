use crate::consts::{
    CONFIG_PATH_ENV_VAR, WEBHOOK_ADDRESS_ENV_VAR, WEBHOOK_DEFAULT_ADDRESS,
    WEBHOOK_DEFAULT_NAMESPACE, WEBHOOK_NAMESPACE_ENV_VAR, WEBHOOK_SERVICE_ENV_VAR,
    WEBHOOK_TLS_CERT_ENV_VAR, WEBHOOK_TLS_KEY_ENV_VAR,
};
use clap::{Args, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the webhook server or the git repository controller
    #[clap(visible_alias = "r")]
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Custom definition resource (CRD) commands
    #[clap(visible_alias = "c")]
    Crd {
        #[command(subcommand)]
        command: CrdCommands,
    },
    /// Configuration commands
    #[clap(visible_alias = "cfg")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunCommands {
    /// Serves the conversion, defaulting and validation webhooks
    #[clap(visible_alias = "w")]
    Webhook {
        /// The address to listen on
        #[clap(short, long, env = WEBHOOK_ADDRESS_ENV_VAR, default_value = WEBHOOK_DEFAULT_ADDRESS)]
        address: SocketAddr,
        /// PEM encoded TLS certificate. Served without TLS if not set
        #[clap(long, env = WEBHOOK_TLS_CERT_ENV_VAR, requires = "tls_key")]
        tls_cert: Option<PathBuf>,
        /// PEM encoded TLS private key
        #[clap(long, env = WEBHOOK_TLS_KEY_ENV_VAR, requires = "tls_cert")]
        tls_key: Option<PathBuf>,
        /// Path to the configuration file. Built-in defaults are used if not set
        #[clap(short, long, env = CONFIG_PATH_ENV_VAR)]
        config: Option<PathBuf>,
        /// Creates a GitRepository when a git function without a preserved
        /// repository name is converted to v1alpha1
        #[clap(long)]
        synthesize_git_repositories: bool,
    },
    /// Keeps v1alpha2 git functions in sync with their v1alpha1 GitRepository
    #[clap(visible_alias = "co")]
    Controller {
        /// Path to the configuration file. Built-in defaults are used if not set
        #[clap(short, long, env = CONFIG_PATH_ENV_VAR)]
        config: Option<PathBuf>,
    },
}

/// Where the API server reaches the conversion webhook.
#[derive(Args, Debug, Clone)]
pub struct WebhookServiceArgs {
    /// Name of the webhook service. No conversion webhook is configured if not set
    #[clap(long, env = WEBHOOK_SERVICE_ENV_VAR)]
    pub webhook_service: Option<String>,
    /// Namespace of the webhook service
    #[clap(long, env = WEBHOOK_NAMESPACE_ENV_VAR, default_value = WEBHOOK_DEFAULT_NAMESPACE)]
    pub webhook_namespace: String,
    /// Port of the webhook service
    #[clap(long)]
    pub webhook_port: Option<i32>,
}

#[derive(Subcommand, Debug)]
pub enum CrdCommands {
    /// Writes the CRDs to a file
    #[clap(visible_alias = "w")]
    Write {
        /// The path to the file to write the CRDs to
        #[clap(short, long)]
        file: PathBuf,
        #[command(flatten)]
        webhook: WebhookServiceArgs,
    },
    /// Prints the CRDs to stdout
    #[clap(visible_alias = "p")]
    Print {
        #[command(flatten)]
        webhook: WebhookServiceArgs,
    },
    /// Installs the CRDs to the cluster
    #[clap(visible_alias = "in")]
    Install {
        #[command(flatten)]
        webhook: WebhookServiceArgs,
    },
    /// Uninstalls the CRDs from the cluster
    #[clap(visible_alias = "un")]
    Uninstall {},
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Prints the effective configuration as YAML
    #[clap(visible_alias = "p")]
    Print {
        /// Path to the configuration file. Built-in defaults are printed if not set
        #[clap(short, long, env = CONFIG_PATH_ENV_VAR)]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tls_cert_requires_key() {
        let result = Cli::try_parse_from(["operator", "run", "webhook", "--tls-cert", "tls.crt"]);

        assert!(result.is_err());
    }

    #[test]
    fn crd_print_takes_webhook_service() {
        let cli = Cli::try_parse_from([
            "operator",
            "crd",
            "print",
            "--webhook-service",
            "serverless-webhook",
        ])
        .unwrap();

        let Commands::Crd {
            command: CrdCommands::Print { webhook },
        } = cli.command
        else {
            panic!("expected crd print");
        };

        assert_eq!(webhook.webhook_service.as_deref(), Some("serverless-webhook"));
        assert_eq!(webhook.webhook_namespace, WEBHOOK_DEFAULT_NAMESPACE);
    }
}

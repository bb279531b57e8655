use crate::{
    cli::WebhookServiceArgs,
    config::Config,
    conversion::{DowngradeFallback, KubeGitRepositories},
    crds::{all_crds, generate_crds, WebhookService, FUNCTION_CRD_NAME, GIT_REPOSITORY_CRD_NAME},
    operator::Operator,
    webhook::{self, TlsFiles, WebhookState},
};
use anyhow::{Context, Result as AnyResult};
use either::Either::Left;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    api::{DeleteParams, PostParams},
    runtime::{conditions, wait::await_condition},
    Api, Client as KubeClient, ResourceExt,
};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{trace_span, Instrument};

async fn load_config(path: Option<PathBuf>) -> AnyResult<Config> {
    let Some(path) = path else {
        tracing::info!("No config file given. Using defaults.");
        return Ok(Config::default());
    };

    tracing::info!(path = %path.display(), "Loading config.");

    Config::load(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

pub async fn run_webhook(
    address: SocketAddr,
    tls_cert: Option<PathBuf>,
    tls_key: Option<PathBuf>,
    config: Option<PathBuf>,
    synthesize_git_repositories: bool,
) -> AnyResult<()> {
    let config = load_config(config).await?;
    let client = KubeClient::try_default().await?;

    let fallback = if synthesize_git_repositories {
        DowngradeFallback::Synthesize
    } else {
        DowngradeFallback::Leave
    };

    let tls = match (tls_cert, tls_key) {
        (Some(cert), Some(key)) => Some(TlsFiles { cert, key }),
        _ => None,
    };

    tracing::info!(%address, tls = tls.is_some(), ?fallback, "Running with current config.");

    let state = WebhookState {
        config,
        repositories: Arc::new(KubeGitRepositories::new(client)),
        fallback,
    };

    webhook::serve(state, address, tls)
        .instrument(trace_span!("Webhook", %address))
        .await
        .context("Webhook server failed")
}

pub async fn run_controller(config: Option<PathBuf>) -> AnyResult<()> {
    // The controller has no tunables; a broken file still fails startup.
    let _config = load_config(config).await?;
    let client = KubeClient::try_default().await?;

    Operator::new(client).run().await;

    Ok(())
}

pub async fn print_config(config: Option<PathBuf>) -> AnyResult<()> {
    let config = load_config(config).await?;
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn webhook_service(args: WebhookServiceArgs) -> Option<WebhookService> {
    args.webhook_service.map(|name| WebhookService {
        name,
        namespace: args.webhook_namespace,
        port: args.webhook_port,
    })
}

pub fn print_crds(webhook: WebhookServiceArgs) -> AnyResult<()> {
    let crds = generate_crds(webhook_service(webhook).as_ref())?;
    println!("{crds}");
    Ok(())
}

pub async fn write_crds_to_file(path: PathBuf, webhook: WebhookServiceArgs) -> AnyResult<()> {
    let crds = generate_crds(webhook_service(webhook).as_ref())?;
    tokio::fs::write(path, crds)
        .await
        .context("Failed to write crds to file")?;
    Ok(())
}

pub async fn install_crds(webhook: WebhookServiceArgs) -> AnyResult<()> {
    let client = KubeClient::try_default().await?;

    let api = Api::<CustomResourceDefinition>::all(client);

    for crd in all_crds(webhook_service(webhook).as_ref())? {
        let name = crd.name_any();
        tracing::info!(%name, "Installing crd.");

        api.create(&PostParams::default(), &crd)
            .await
            .with_context(|| format!("Failed to create crd {name}"))?;

        await_condition(api.clone(), &name, conditions::is_crd_established()).await?;
    }

    Ok(())
}

pub async fn uninstall_crds() -> AnyResult<()> {
    let client = KubeClient::try_default().await?;

    let api = Api::<CustomResourceDefinition>::all(client);

    for name in [FUNCTION_CRD_NAME, GIT_REPOSITORY_CRD_NAME] {
        tracing::info!(%name, "Uninstalling crd.");

        let obj = api
            .delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("Failed to delete crd {name}"))?;

        if let Left(o) = obj {
            match o.uid() {
                Some(uid) => {
                    await_condition(api.clone(), name, conditions::is_deleted(&uid)).await?;
                }
                None => {
                    tracing::warn!(%name, "Could not find crd's uid");
                }
            }
        }
    }

    Ok(())
}

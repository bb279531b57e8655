//! Keeps the git source of v1alpha2 Functions in line with the v1alpha1
//! GitRepository they were converted from.

mod errors;

use crate::{
    consts::GIT_REPO_NAME_ANNOTATION,
    crds::{
        v1alpha1::GitRepository,
        v1alpha2::{Function, RepositoryAuth},
    },
};
use errors::*;
use futures::stream::StreamExt;
use kube::{
    api::{ListParams, PostParams},
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client as KubeClient, ResourceExt,
};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{trace_span, Instrument};

/// Whether `function` was converted from the repository called `repository_name`.
pub fn tracks_repository(function: &Function, repository_name: &str) -> bool {
    function
        .annotations()
        .get(GIT_REPO_NAME_ANNOTATION)
        .is_some_and(|name| name == repository_name)
}

/// Copies url and auth of `repository` into the git source of `function`.
///
/// Returns `false` when the function has no git source or is already in sync.
pub fn sync_git_source(repository: &GitRepository, function: &mut Function) -> bool {
    let Some(git) = function.spec.source.git_repository.as_mut() else {
        return false;
    };

    let url = &repository.spec.url;
    let auth = repository.spec.auth.clone().map(RepositoryAuth::from);

    if &git.url == url && git.auth == auth {
        return false;
    }

    git.url = url.clone();
    git.auth = auth;

    true
}

struct OperatorInner {
    client: KubeClient,
    api: Api<GitRepository>,
}

impl OperatorInner {
    fn new(client: KubeClient) -> Self {
        let api = Api::all(client.clone());

        Self { client, api }
    }

    async fn reconcile(&self, repository: Arc<GitRepository>) -> Result<Action, ReconcileError> {
        let name = repository.name_any();

        let Some(namespace) = repository.namespace() else {
            tracing::error!(%name, "Resource has no namespace. Aborting.");
            return Err(ReconcileError::Namespace);
        };

        let span = trace_span!("ReconcileResource", %name, %namespace);
        self.sync_functions(&repository, &name, &namespace)
            .instrument(span)
            .await?;

        Ok(Action::await_change())
    }

    async fn sync_functions(
        &self,
        repository: &GitRepository,
        name: &str,
        namespace: &str,
    ) -> Result<(), ReconcileError> {
        let api: Api<Function> = Api::namespaced(self.client.clone(), namespace);

        let functions = api
            .list(&ListParams::default())
            .await
            .map_err(ReconcileError::ListFunctions)?;

        for mut function in functions
            .items
            .into_iter()
            .filter(|function| tracks_repository(function, name))
        {
            if !sync_git_source(repository, &mut function) {
                continue;
            }

            let function_name = function.name_any();
            api.replace(&function_name, &PostParams::default(), &function)
                .await
                .map_err(|error| ReconcileError::SyncFunction {
                    name: function_name.clone(),
                    error,
                })?;

            tracing::info!(function = %function_name, "Synced git source.");
        }

        Ok(())
    }
}

pub struct Operator {
    inner: Arc<OperatorInner>,
}

impl Operator {
    pub fn new(client: KubeClient) -> Self {
        let inner = Arc::new(OperatorInner::new(client));

        Self { inner }
    }

    pub async fn run(self) {
        tracing::info!("Starting.");

        let api = self.inner.api.clone();

        Controller::new(api, Config::default())
            .shutdown_on_signal()
            .run(reconcile, on_error, self.inner)
            .for_each(|reconciliation_result| async move {
                match reconciliation_result {
                    Ok(_) => {
                        tracing::info!("Reconciliation successful.");
                    }
                    Err(error) => {
                        tracing::error!(%error, "Reconciliation failed.");
                    }
                }
            })
            .await;

        tracing::info!("Terminated.");
    }
}

async fn reconcile(
    repository: Arc<GitRepository>,
    context: Arc<OperatorInner>,
) -> Result<Action, ReconcileError> {
    context.reconcile(repository).await
}

fn on_error(
    _repository: Arc<GitRepository>,
    error: &ReconcileError,
    _context: Arc<OperatorInner>,
) -> Action {
    tracing::error!(%error, "Reconciliation failed. Requeuing.");

    Action::requeue(Duration::from_secs(10))
}

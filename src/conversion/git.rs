use crate::{
    consts::PKG_NAME,
    crds::v1alpha1::{GitRepository, GitRepositorySpec},
};
use async_trait::async_trait;
use kube::{
    api::{Patch, PatchParams},
    Api, Client,
};
#[cfg(test)]
use mockall::automock;

/// Cluster access needed while converting git functions.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GitRepositoryStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<GitRepository, kube::Error>;

    /// Creates or updates the repository `namespace/name` with `spec`.
    async fn apply(
        &self,
        namespace: &str,
        name: &str,
        spec: GitRepositorySpec,
    ) -> Result<GitRepository, kube::Error>;
}

pub struct KubeGitRepositories {
    client: Client,
}

impl KubeGitRepositories {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GitRepositoryStore for KubeGitRepositories {
    async fn get(&self, namespace: &str, name: &str) -> Result<GitRepository, kube::Error> {
        let api: Api<GitRepository> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await
    }

    async fn apply(
        &self,
        namespace: &str,
        name: &str,
        spec: GitRepositorySpec,
    ) -> Result<GitRepository, kube::Error> {
        let api: Api<GitRepository> = Api::namespaced(self.client.clone(), namespace);

        let mut repository = GitRepository::new(name, spec);
        repository.metadata.namespace = Some(namespace.to_string());

        api.patch(
            name,
            &PatchParams::apply(PKG_NAME).force(),
            &Patch::Apply(&repository),
        )
        .await
    }
}

use super::WebhookState;
use crate::conversion::{convert_review, ConversionReview};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use std::sync::Arc;

pub(super) async fn convert(
    State(state): State<Arc<WebhookState>>,
    payload: Result<Json<ConversionReview>, JsonRejection>,
) -> Result<Json<ConversionReview>, (StatusCode, String)> {
    let Json(review) = payload.map_err(|rejection| {
        tracing::warn!(%rejection, "Failed to decode conversion review.");
        (StatusCode::BAD_REQUEST, rejection.to_string())
    })?;

    let converted = convert_review(review, state.repositories.as_ref(), state.fallback).await;

    Ok(Json(converted))
}

#[cfg(test)]
mod tests {
    use super::super::{router, tests::*};
    use crate::{
        consts::{CONVERT_PATH, GIT_REPO_NAME_ANNOTATION},
        conversion::git::MockGitRepositoryStore,
        crds::v1alpha1::{GitRepository, GitRepositorySpec, RepositoryAuth, RepositoryAuthType},
    };
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn converts_git_function_to_v1alpha2() {
        let mut repositories = MockGitRepositoryStore::new();
        repositories
            .expect_get()
            .withf(|namespace, name| namespace == "default" && name == "my-repo")
            .returning(|_, name| {
                Ok(GitRepository::new(
                    name,
                    GitRepositorySpec {
                        url: String::from("git@github.com:org/repo.git"),
                        auth: Some(RepositoryAuth {
                            auth_type: RepositoryAuthType::Key,
                            secret_name: String::from("ssh-key"),
                        }),
                    },
                ))
            });

        let body = json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "ConversionReview",
            "request": {
                "uid": "c2d0a0a6-2b6a-4b8f-9d38-0d1a3f6f2b11",
                "desiredAPIVersion": "serverless.operato.rs/v1alpha2",
                "objects": [{
                    "apiVersion": "serverless.operato.rs/v1alpha1",
                    "kind": "Function",
                    "metadata": {"name": "my-function", "namespace": "default"},
                    "spec": {
                        "type": "git",
                        "source": "my-repo",
                        "baseDir": "/",
                        "reference": "main",
                        "runtime": "nodejs16"
                    }
                }]
            }
        });

        let (status, review) =
            post_json(router(state(repositories)), CONVERT_PATH, &body).await;

        assert_eq!(status, StatusCode::OK);
        let response = &review["response"];
        assert_eq!(response["uid"], "c2d0a0a6-2b6a-4b8f-9d38-0d1a3f6f2b11");
        assert_eq!(response["result"]["status"], "Success");

        let converted = &response["convertedObjects"][0];
        assert_eq!(converted["apiVersion"], "serverless.operato.rs/v1alpha2");
        assert_eq!(
            converted["metadata"]["annotations"][GIT_REPO_NAME_ANNOTATION],
            "my-repo"
        );
        assert_eq!(
            converted["spec"]["source"]["gitRepository"]["url"],
            "git@github.com:org/repo.git"
        );
        assert_eq!(
            converted["spec"]["source"]["gitRepository"]["auth"],
            json!({"type": "key", "secretName": "ssh-key"})
        );
    }
}

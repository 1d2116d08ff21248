use std::path::Path;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;
use tracing::info;

use crate::infrastructure::k8s::KubernetesError;

fn connection_failed(message: impl Into<String>) -> KubernetesError {
    KubernetesError::ConnectionFailed {
        message: message.into(),
    }
}

async fn load_config(kubeconfig: Option<&Path>) -> Result<Config, Report<KubernetesError>> {
    let Some(path) = kubeconfig else {
        // in-cluster service account, then ~/.kube/config
        return Config::infer()
            .await
            .change_context(connection_failed("Failed to infer Kubernetes configuration"));
    };

    let kubeconfig = Kubeconfig::read_from(path).change_context(connection_failed(format!(
        "Failed to read kubeconfig file: {}",
        path.display()
    )))?;

    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .change_context(connection_failed(format!(
            "Failed to create config from kubeconfig: {}",
            path.display()
        )))
}

/// Builds the Kubernetes client and checks that the API server answers.
///
/// The controller cannot do anything without the cluster, so callers treat an
/// error here as fatal.
///
/// # Errors
///
/// - [`KubernetesError::ConnectionFailed`] if no configuration is usable or the
///   API server is unreachable
pub async fn init_kube_client(
    kubeconfig: Option<&Path>,
) -> Result<Client, Report<KubernetesError>> {
    let config = load_config(kubeconfig).await?;
    let cluster_url = config.cluster_url.clone();

    let client = Client::try_from(config)
        .change_context(connection_failed("Failed to create Kubernetes client"))?;

    let version = client
        .apiserver_version()
        .await
        .change_context(connection_failed(format!(
            "API server {cluster_url} is unreachable"
        )))?;

    info!(
        cluster_url = %cluster_url,
        server_version = %version.git_version,
        "Connected to Kubernetes API server"
    );
    Ok(client)
}

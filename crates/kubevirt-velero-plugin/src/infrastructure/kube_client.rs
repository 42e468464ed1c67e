use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::infrastructure::k8s::KubernetesError;

/// Where to find cluster credentials.
#[derive(Debug, Clone, Default)]
pub struct KubeClientOptions {
    /// Explicit kubeconfig file; in-cluster config or `~/.kube/config` when unset
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one
    pub context: Option<String>,
}

/// Build a Kubernetes client.
///
/// # Errors
///
/// - [`KubernetesError::ConnectionFailed`] if no usable configuration is found
pub async fn init_kube_client(
    options: &KubeClientOptions,
) -> Result<Client, Report<KubernetesError>> {
    let kube_options = KubeConfigOptions {
        context: options.context.clone(),
        ..Default::default()
    };

    let config = match (&options.kubeconfig, &options.context) {
        (Some(kubeconfig_path), _) => {
            let kubeconfig = Kubeconfig::read_from(kubeconfig_path).change_context(
                KubernetesError::ConnectionFailed {
                    message: format!(
                        "Failed to read kubeconfig file: {}",
                        kubeconfig_path.display()
                    ),
                },
            )?;

            Config::from_custom_kubeconfig(kubeconfig, &kube_options)
                .await
                .change_context(KubernetesError::ConnectionFailed {
                    message: format!(
                        "Failed to create config from kubeconfig: {}",
                        kubeconfig_path.display()
                    ),
                })?
        }
        (None, Some(context)) => Config::from_kubeconfig(&kube_options)
            .await
            .change_context(KubernetesError::ConnectionFailed {
                message: format!("Failed to load kubeconfig context: {context}"),
            })?,
        (None, None) => {
            Config::infer()
                .await
                .change_context(KubernetesError::ConnectionFailed {
                    message: "Failed to infer Kubernetes configuration".to_string(),
                })?
        }
    };

    tracing::debug!(cluster_url = %config.cluster_url, "Kubernetes configuration loaded");

    Client::try_from(config).change_context(KubernetesError::ConnectionFailed {
        message: "Failed to create Kubernetes client".to_string(),
    })
}

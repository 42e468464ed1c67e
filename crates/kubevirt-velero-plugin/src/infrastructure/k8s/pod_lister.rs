use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::Api;
use kube::Client;

use crate::domain::traits::PodLister;
use crate::infrastructure::k8s::KubernetesError;

/// Lists pods through the Kubernetes API.
#[derive(Clone)]
pub struct KubePodLister {
    client: Client,
}

impl KubePodLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodLister for KubePodLister {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, Report<KubernetesError>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .change_context(KubernetesError::LookupFailed {
                kind: "Pod",
                namespace: namespace.to_string(),
                message: format!("Failed to list pods with selector {label_selector}"),
            })?;

        tracing::debug!(namespace, label_selector, count = pods.items.len(), "Listed pods");
        Ok(pods.items)
    }
}

pub mod cli;
pub mod manifest;

use crate::domain::backup_item_action::ActionConfig;
use crate::infrastructure::kube_client::KubeClientOptions;

impl From<&cli::EvaluateArgs> for ActionConfig {
    fn from(args: &cli::EvaluateArgs) -> Self {
        Self {
            honor_pvc_exclusion_labels: args.honor_pvc_exclusion_labels,
        }
    }
}

impl From<&cli::EvaluateArgs> for KubeClientOptions {
    fn from(args: &cli::EvaluateArgs) -> Self {
        Self {
            kubeconfig: args.kubeconfig.clone(),
            context: args.context.clone(),
        }
    }
}

pub use cli::*;

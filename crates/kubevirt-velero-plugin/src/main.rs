use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use kubevirt_velero_plugin::backup_item_action::ActionConfig;
use kubevirt_velero_plugin::backup_item_action::VmiBackupItemAction;
use kubevirt_velero_plugin::config::manifest;
use kubevirt_velero_plugin::config::Cli;
use kubevirt_velero_plugin::config::Commands;
use kubevirt_velero_plugin::config::EvaluateArgs;
use kubevirt_velero_plugin::k8s::KubeExclusionLabels;
use kubevirt_velero_plugin::k8s::KubePodLister;
use kubevirt_velero_plugin::kube_client;
use kubevirt_velero_plugin::kube_client::KubeClientOptions;
use kubevirt_velero_plugin::logging;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();
    let _guard = logging::init();

    match cli.command {
        Commands::Evaluate(args) => run_evaluate(args).await,
    }
}

async fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let item = manifest::load_item(&args.item).map_err(|e| anyhow::anyhow!("{e:?}"))?;
    let backup = manifest::load_backup_spec(args.backup.as_deref())
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;

    let client = kube_client::init_kube_client(&KubeClientOptions::from(&args))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize Kubernetes client: {e:?}"))?;

    let action = VmiBackupItemAction::new(
        KubePodLister::new(client.clone()),
        KubeExclusionLabels::new(client),
        ActionConfig::from(&args),
    );

    let output = match action.execute_unstructured(item, &backup).await {
        Ok(output) => output,
        Err(report) if report.current_context().is_validation() => {
            tracing::debug!("Backup item rejected: {report:?}");
            anyhow::bail!("{}", report.current_context());
        }
        Err(report) => return Err(anyhow::anyhow!("{report:?}")),
    };

    let rendered = serde_json::to_string_pretty(&output).context("serialize action output")?;
    println!("{rendered}");
    Ok(())
}

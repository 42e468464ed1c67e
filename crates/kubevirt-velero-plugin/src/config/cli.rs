use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(about, long_about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a VirtualMachineInstance against a backup configuration
    Evaluate(EvaluateArgs),
}

#[derive(Parser, Clone, Debug)]
pub struct EvaluateArgs {
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "VirtualMachineInstance manifest (YAML or JSON), '-' for stdin"
    )]
    pub item: PathBuf,

    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Velero Backup manifest or bare backup spec; every resource is included when omitted"
    )]
    pub backup: Option<PathBuf>,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(long, help = "Kubeconfig context to use")]
    pub context: Option<String>,

    #[arg(
        long,
        env = "HONOR_PVC_EXCLUSION_LABELS",
        help = "Reject running VMIs whose PVCs carry velero.io/exclude-from-backup=true",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub honor_pvc_exclusion_labels: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_evaluate_defaults() {
        let cli = Cli::try_parse_from(["kubevirt-velero-plugin", "evaluate", "--item", "vmi.yaml"])
            .unwrap();
        let Commands::Evaluate(args) = cli.command;

        assert_eq!(args.item, PathBuf::from("vmi.yaml"));
        assert!(args.backup.is_none());
        assert!(args.context.is_none());
        assert!(!args.honor_pvc_exclusion_labels);
    }

    #[test]
    fn parse_evaluate_all_flags() {
        let cli = Cli::try_parse_from([
            "kubevirt-velero-plugin",
            "evaluate",
            "--item",
            "vmi.yaml",
            "--backup",
            "backup.yaml",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--context",
            "staging",
            "--honor-pvc-exclusion-labels",
            "true",
        ])
        .unwrap();
        let Commands::Evaluate(args) = cli.command;

        assert_eq!(args.backup, Some(PathBuf::from("backup.yaml")));
        assert_eq!(args.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(args.context.as_deref(), Some("staging"));
        assert!(args.honor_pvc_exclusion_labels);
    }

    #[test]
    fn item_is_required() {
        assert!(Cli::try_parse_from(["kubevirt-velero-plugin", "evaluate"]).is_err());
    }
}

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::domain::eligibility::DEFAULT_ALTERNATE_SCHEDULER;
use crate::domain::resources::CpuRequestSource;
use crate::domain::ReconcilerSettings;
use crate::infrastructure::dispatcher::DispatcherConfig;

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "POD_INFO_NAMESPACE",
        default_value = "default",
        help = "Namespace every PodInfo record is written to"
    )]
    pub podinfo_namespace: String,

    #[arg(
        long,
        env = "WATCH_NAMESPACE",
        help = "Namespace to watch pods in (empty for all namespaces)"
    )]
    pub watch_namespace: Option<String>,

    #[arg(
        long,
        env = "ALTERNATE_SCHEDULER_NAME",
        default_value = DEFAULT_ALTERNATE_SCHEDULER,
        help = "Pods placed by this scheduler are left alone"
    )]
    pub alternate_scheduler: String,

    #[arg(
        long,
        env = "CPU_REQUEST_SOURCE",
        value_enum,
        default_value_t = CpuRequestSource::Limits,
        help = "Where cpuRequest is read from; `limits` mirrors the CPU limit"
    )]
    pub cpu_request_source: CpuRequestSource,

    #[arg(
        long,
        env = "RECONCILE_WORKERS",
        default_value = "4",
        help = "Number of reconciliations allowed to run at the same time"
    )]
    pub workers: usize,

    #[arg(
        long,
        default_value = "200",
        help = "Delay before the first retry of a failed reconciliation, in milliseconds"
    )]
    pub requeue_base_delay_ms: u64,

    #[arg(
        long,
        default_value = "300",
        help = "Upper bound for the retry delay, in seconds"
    )]
    pub requeue_max_delay_secs: u64,

    #[arg(
        long,
        help = "Load existing PodInfos into the cache and re-check their pods on startup",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub resync_on_start: bool,

    #[arg(
        long,
        env = "API_LISTEN_ADDR",
        default_value = "0.0.0.0:8080",
        help = "HTTP API server listen address"
    )]
    pub api_listen_addr: String,
}

impl From<&RunArgs> for ReconcilerSettings {
    fn from(args: &RunArgs) -> Self {
        Self {
            alternate_scheduler: args.alternate_scheduler.clone(),
            cpu_request_source: args.cpu_request_source,
        }
    }
}

impl From<&RunArgs> for DispatcherConfig {
    fn from(args: &RunArgs) -> Self {
        Self {
            workers: args.workers.max(1),
            requeue_base_delay: Duration::from_millis(args.requeue_base_delay_ms),
            requeue_max_delay: Duration::from_secs(args.requeue_max_delay_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    fn parse(extra: &[&str]) -> RunArgs {
        let args = std::iter::once("run").chain(extra.iter().copied());
        RunArgs::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn defaults_are_applied() {
        let args = parse(&["--podinfo-namespace", "default"]);

        assert_eq!(args.alternate_scheduler, "scheduling-plugin");
        assert_eq!(args.cpu_request_source, CpuRequestSource::Limits);
        assert!(args.resync_on_start);

        let dispatcher = DispatcherConfig::from(&args);
        assert_eq!(dispatcher.workers, 4);
        assert_eq!(dispatcher.requeue_base_delay, Duration::from_millis(200));
        assert_eq!(dispatcher.requeue_max_delay, Duration::from_secs(300));
    }

    #[test]
    fn settings_follow_flags() {
        let args = parse(&[
            "--podinfo-namespace",
            "flux",
            "--alternate-scheduler",
            "fluence",
            "--cpu-request-source",
            "requests",
            "--workers",
            "0",
            "--resync-on-start",
            "false",
        ]);

        let settings = ReconcilerSettings::from(&args);
        assert_eq!(settings.alternate_scheduler, "fluence");
        assert_eq!(settings.cpu_request_source, CpuRequestSource::Requests);
        assert_eq!(args.podinfo_namespace, "flux");
        assert!(!args.resync_on_start);
        assert_eq!(DispatcherConfig::from(&args).workers, 1);
    }
}

use anyhow::Context;
use anyhow::Result;
use api_types::PodInfo;
use clap::Parser;
use kube::CustomResourceExt;
use podinfo_controller::app::ApplicationBuilder;
use podinfo_controller::config::Cli;
use podinfo_controller::config::Commands;
use podinfo_controller::config::RunArgs;
use podinfo_controller::logging;
use utils::version;

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

    match cli.command {
        Commands::Run(run_args) => run_controller(*run_args).await,
        Commands::Crd => print_crd(),
    }
}

async fn run_controller(run_args: RunArgs) -> Result<()> {
    let _guard = logging::init();

    tracing::info!("Starting podinfo controller {}", &**version::VERSION);

    let app = ApplicationBuilder::new(run_args).build().await?;

    app.run().await?;
    app.shutdown().await?;

    Ok(())
}

fn print_crd() -> Result<()> {
    let manifest =
        serde_yaml::to_string(&PodInfo::crd()).context("serialize PodInfo CRD failed")?;
    print!("{manifest}");
    Ok(())
}

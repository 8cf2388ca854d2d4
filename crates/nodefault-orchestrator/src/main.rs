use nodefault_cluster::{KubeNodeRepository, NodeConditionWaiter};
use nodefault_gcp::GceInstances;
use nodefault_orchestrator::{OutcomeFormat, ScenarioConfig, ScenarioController, ScenarioOrchestrator};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nodefault=info,info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ScenarioConfig::from_env()?;
    info!(
        scenario = %config.fault_kind,
        node = %config.node,
        instance_kill_count = config.instance_kill_count,
        timeout_secs = config.timeout_secs,
        "Starting node fault injection"
    );

    let gce = GceInstances::connect().await?;
    let controller = gce.controller.with_poll_interval(config.status_poll_interval);

    let nodes = KubeNodeRepository::try_default().await?;
    let cluster = Arc::new(NodeConditionWaiter::new(Arc::new(nodes)));

    let orchestrator = ScenarioOrchestrator::new(gce.directory, controller, cluster)
        .with_absence_poll_interval(config.absence_poll_interval);
    let scenarios = ScenarioController::new(Arc::new(orchestrator));

    let outcome = match scenarios
        .run(
            config.fault_kind,
            config.instance_kill_count,
            &config.node,
            config.timeout_secs,
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Node fault scenario failed");
            return Err(e.into());
        }
    };

    match config.outcome_format {
        OutcomeFormat::Json => println!("{}", outcome.to_json()?),
        OutcomeFormat::Text if outcome.fully_converged() => info!(
            scenario = %outcome.fault_kind,
            node = %outcome.node_name,
            iterations = outcome.iterations_completed,
            "Node fault scenario completed"
        ),
        OutcomeFormat::Text => warn!(
            scenario = %outcome.fault_kind,
            node = %outcome.node_name,
            iterations = outcome.iterations_completed,
            cloud_timeouts = ?outcome.cloud_timeouts,
            cluster_timeouts = ?outcome.cluster_timeouts,
            "Node fault scenario completed with unconverged waits"
        ),
    }

    Ok(())
}

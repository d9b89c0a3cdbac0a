use anyhow::Context;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use lifecycle_core::{EcsTaskRunner, Route53Zone, StepFunctionsEngine, StopConfig};
use stop_container::{Request, Response, StopService};

type Service = StopService<EcsTaskRunner, Route53Zone, StepFunctionsEngine>;

async fn function_handler(
    service: &Service,
    config: &StopConfig,
    event: LambdaEvent<Request>,
) -> Result<Response, Error> {
    Ok(service.handle(config, &event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = StopConfig::from_env().context("loading stop-container configuration")?;
    let aws = lifecycle_core::load_aws_config().await;
    let service = StopService::new(
        EcsTaskRunner::new(&aws),
        Route53Zone::new(&aws),
        StepFunctionsEngine::new(&aws),
    );

    let service = &service;
    let config = &config;
    run(service_fn(move |event: LambdaEvent<Request>| async move {
        function_handler(service, config, event).await
    }))
    .await
}

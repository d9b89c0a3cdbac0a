use anyhow::Context;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use lifecycle_core::{EcsTaskRunner, Route53Zone, StartConfig, StepFunctionsEngine};
use start_container::{Request, Response, StartService};

type Service = StartService<EcsTaskRunner, Route53Zone, StepFunctionsEngine>;

async fn function_handler(
    service: &Service,
    config: &StartConfig,
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

    let config = StartConfig::from_env().context("loading start-container configuration")?;
    let aws = lifecycle_core::load_aws_config().await;
    let service = StartService::new(
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

use cleanup::{CleanupService, Request, Response};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use lifecycle_core::Route53Zone;

async fn function_handler(
    service: &CleanupService<Route53Zone>,
    event: LambdaEvent<Request>,
) -> Result<Response, Error> {
    Ok(service.handle(&event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let aws = lifecycle_core::load_aws_config().await;
    let service = CleanupService::new(Route53Zone::new(&aws));

    let service = &service;
    run(service_fn(move |event: LambdaEvent<Request>| async move {
        function_handler(service, event).await
    }))
    .await
}

use aws_lambda_events::sqs::SqsEvent;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use shift_alarms::handlers::alarm_consumer::{self, BatchResponse};
use shift_alarms::handlers::App;
use shift_alarms::telemetry;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let app = App::from_env().await?;
    let scheduler = app.alarm_scheduler().await;
    let scheduler = &scheduler;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| async move {
        Ok::<BatchResponse, Error>(alarm_consumer::handle(scheduler, event.payload, Utc::now()).await)
    }))
    .await
}

use aws_lambda_events::dynamodb::Event;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use shift_alarms::handlers::{shift_stream, App};
use shift_alarms::telemetry;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let app = App::from_env().await?;
    let scheduler = app.alarm_scheduler().await;
    let scheduler = &scheduler;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Event>| async move {
        shift_stream::handle(scheduler, event.payload, Utc::now())
            .await
            .map_err(Error::from)
    }))
    .await
}

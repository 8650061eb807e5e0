use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use shift_alarms::handlers::jobs::JobRequest;
use shift_alarms::handlers::App;
use shift_alarms::jobs::{DutySync, JobReport};
use shift_alarms::telemetry;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let app = App::from_env().await?;
    let job = DutySync::new(app.store.clone(), app.config.jobs);
    let job = &job;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<JobRequest>| async move {
        let request = event.payload;
        let report: JobReport = job.run(request.time_or(Utc::now()), request.cursor).await?;
        Ok::<JobReport, Error>(report)
    }))
    .await
}

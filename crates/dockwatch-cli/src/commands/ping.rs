//! `dockwatch ping` — Send a test notification to every configured sink.

use std::sync::Arc;

use clap::Args;
use dockwatch_notify::classify::started_title;
use dockwatch_notify::dispatch::Dispatcher;
use dockwatch_notify::payload::{Attachment, NotificationPayload, Severity};
use dockwatch_notify::transport::HttpTransport;

use super::Settings;
use crate::output::format_outcome;

/// Arguments for the `ping` command.
#[derive(Args, Debug)]
pub struct PingArgs {
    /// Container name shown in the test notification.
    #[arg(long, default_value = "dockwatch-ping")]
    pub name: String,

    /// Image shown in the test notification.
    #[arg(long, default_value = "dockwatch")]
    pub image: String,
}

/// Builds the synthetic start notification sent by `ping`.
fn test_payload(args: &PingArgs, ts: i64) -> NotificationPayload {
    NotificationPayload::single(Attachment::new(
        started_title(&args.name, &args.image),
        Severity::Success,
        ts,
    ))
}

/// Executes the `ping` command.
///
/// Prints one line per sink.
///
/// # Errors
///
/// Returns an error if no sink is configured or none accepted the message.
pub async fn execute(args: PingArgs, settings: &Settings) -> anyhow::Result<()> {
    let sinks = Arc::new(settings.sinks()?);
    let dispatcher = Dispatcher::new(Arc::new(HttpTransport::new()?), sinks);

    let payload = test_payload(&args, chrono::Utc::now().timestamp());
    let report = dispatcher.deliver(&payload).await?;

    for outcome in &report.outcomes {
        println!("{}", format_outcome(outcome));
    }

    if report.delivered() == 0 {
        anyhow::bail!("no sink accepted the test notification");
    }
    Ok(())
}

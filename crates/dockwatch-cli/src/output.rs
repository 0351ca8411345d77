//! Formatted output helpers for CLI commands.

use dockwatch_notify::dispatch::DeliveryOutcome;

/// Shortens a webhook URL to scheme and host.
///
/// Webhook paths embed the secret that authorizes posting, so they never
/// appear in logs or terminal output.
#[must_use]
pub fn redact_url(url: &str) -> String {
    let (scheme, rest) = url.split_once("://").unwrap_or(("", url));
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let hidden = rest.len() > authority.len();
    match (scheme.is_empty(), hidden) {
        (true, _) => "<redacted>".to_owned(),
        (false, true) => format!("{scheme}://{host}/…"),
        (false, false) => format!("{scheme}://{host}"),
    }
}

/// Renders one sink's delivery result as a status line.
#[must_use]
pub fn format_outcome(outcome: &DeliveryOutcome) -> String {
    match &outcome.result {
        Ok(()) => format!("{:<10} ok", outcome.sink),
        Err(e) => format!("{:<10} FAILED  {e}", outcome.sink),
    }
}

//! Process-wide tracing setup plus a small span helper used to name units of
//! work (agent loop runs, scheduler job evaluations) consistently.

use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a JSON-structured subscriber reading `RUST_LOG` (defaulting to
/// `info`) for filtering. Call once from each binary's `main`.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true).with_current_span(true))
        .try_init()?;

    Ok(())
}

/// Names a logical unit of work (e.g. `"agent_loop:<conversation_id>"`,
/// `"scheduler:<job_id>"`) as an `info`-level span, mirroring the naming
/// convention used for scheduled jobs.
#[derive(Debug)]
pub struct SystemSpan {
    span: Span,
}

impl SystemSpan {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { span: tracing::info_span!("system_span", name = %name) }
    }

    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_span_carries_its_name() {
        let span = SystemSpan::new("agent_loop:test-conversation");
        assert!(!span.span().is_disabled());
    }
}

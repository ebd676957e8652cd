//! Shared plumbing for the `contracts` CLI and the `contracts-ui` web server.

pub mod output;
pub mod ui;

use contracts_core::{Error, ErrorKind};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    Ok(())
}

/// Process exit status for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.chain().find_map(|e| e.downcast_ref::<Error>()).map(Error::kind) {
        Some(ErrorKind::Configuration) => 2,
        Some(ErrorKind::Ingestion) => 3,
        Some(ErrorKind::Store) => 4,
        Some(ErrorKind::ExternalService) => 5,
        Some(ErrorKind::Io) | None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(exit_code(&Error::MissingSetting("GROQ_API_KEY").into()), 2);
        assert_eq!(exit_code(&Error::UnsupportedLoader("docx".into()).into()), 3);
        assert_eq!(exit_code(&Error::CollectionNotFound("x".into()).into()), 4);
        assert_eq!(exit_code(&Error::external("Groq", "401").into()), 5);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }

    #[test]
    fn context_does_not_hide_the_kind() {
        let err = Err::<(), _>(Error::Ingestion("bad pdf".into())).context("ingest failed").unwrap_err();
        assert_eq!(exit_code(&err), 3);
    }
}

//! # Logging
//!
//! Structured events go through `tracing`. `init` installs a global fmt
//! subscriber filtered by `RUST_LOG`, defaulting to `filevault=info`.
//!
//! Content and key material are never recorded in events.

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::{VaultError, VaultResult};

/// Output format of the fmt subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

const DEFAULT_DIRECTIVE: &str = "filevault=info";

fn env_filter() -> VaultResult<EnvFilter> {
    let directive: Directive = DEFAULT_DIRECTIVE
        .parse()
        .map_err(|e| VaultError::Config(format!("bad log directive: {}", e)))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init(format: LogFormat) -> VaultResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter()?);

    let result = match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    result.map_err(|e| VaultError::Config(format!("failed to install log subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(serde_json::to_value(LogFormat::Json).unwrap(), "json");
        assert_eq!(
            serde_json::from_value::<LogFormat>(serde_json::json!("pretty")).unwrap(),
            LogFormat::Pretty
        );
    }

    #[test]
    fn test_second_init_fails() {
        // Only one global subscriber can exist per process
        let _ = init(LogFormat::Pretty);
        assert!(init(LogFormat::Json).is_err());
    }
}

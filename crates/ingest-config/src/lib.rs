//! # ingest-config
//!
//! Layered configuration: compiled-in defaults, overridden by an optional
//! TOML file, overridden by `INGEST_*` environment variables. Loads a
//! `.env` file from the working directory first, matching the rest of this
//! stack's local-development convention.

pub mod error;
pub mod general;

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};

pub use error::ConfigError;
pub use general::IngestConfig;

impl IngestConfig {
    /// Load configuration from defaults, an optional TOML file, and
    /// `INGEST_*`-prefixed environment variables, in that precedence order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a present TOML file is malformed or an
    /// environment override can't be coerced into its field's type.
    pub fn load(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_err() {
            tracing::debug!("no .env file found; continuing with process environment");
        }

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = toml_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("INGEST_"));

        let config: Self = figment.extract()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = IngestConfig::default();
        assert_eq!(cfg.worker_max_concurrent, 3);
        assert_eq!(cfg.chunk_target, 450);
        assert_eq!(cfg.chunk_hard_cap, 800);
        assert_eq!(cfg.stale_running_minutes, 15);
        assert_eq!(cfg.crash_recovery_minutes, 10);
    }

    #[test]
    fn env_override_takes_precedence_over_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Ingest.toml",
                r#"
                worker_max_concurrent = 5
                chunk_target = 300
                "#,
            )?;
            jail.set_env("INGEST_WORKER_MAX_CONCURRENT", "9");

            let cfg = IngestConfig::load(Some(Path::new("Ingest.toml"))).unwrap();
            assert_eq!(cfg.worker_max_concurrent, 9);
            assert_eq!(cfg.chunk_target, 300);
            Ok(())
        });
    }

    #[test]
    fn missing_toml_file_falls_back_to_defaults() {
        Jail::expect_with(|_| {
            let cfg = IngestConfig::load(Some(Path::new("does-not-exist.toml"))).unwrap();
            assert_eq!(cfg.chunk_target, 450);
            Ok(())
        });
    }
}

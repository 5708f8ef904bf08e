//! First-start checks.

use tracing::warn;

use crate::config::ServerConfig;

/// Refuse to start on a config that cannot serve traffic.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!(
            "Auth JWT secret is empty in configuration.\n\
             Set [auth].jwt_secret or SUPABASE_JWT_SECRET."
        );
    }
    Ok(())
}

/// Log the optional collaborators that are switched off.
pub fn report_disabled(config: &ServerConfig) {
    let checks = [
        ("payments", config.stripe.secret_key.is_empty()),
        ("stripe webhooks", config.stripe.webhook_secret.is_empty()),
        ("order email", config.email.api_key.is_empty()),
        ("help desk", config.helpdesk.api_key.is_empty() || config.helpdesk.domain.is_empty()),
        ("captcha", config.turnstile.secret_key.is_empty()),
        ("blog content", config.cms.project_id.is_empty()),
        ("account actions", config.auth.url.is_empty()),
    ];
    for (feature, off) in checks {
        if off {
            warn!(feature, "not configured, endpoints will return 500");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, StorageConfig};

    fn config(data_dir: &str, secret: &str) -> ServerConfig {
        ServerConfig {
            storage: StorageConfig {
                data_dir: data_dir.to_string(),
            },
            auth: AuthConfig {
                jwt_secret: secret.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_verify_config() {
        assert!(verify_config(&config("", "secret")).is_err());
        assert!(verify_config(&config("/tmp", "")).is_err());
        assert!(verify_config(&config("/tmp", "secret")).is_ok());
    }
}

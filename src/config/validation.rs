//! Configuration validation functions.

use super::Config;

/// Validate configuration security and warn about risky settings
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    let is_prod = is_production_mode();

    if config.security.require_admin_auth {
        let token_present = config
            .security
            .admin_auth_token
            .as_ref()
            .is_some_and(|t| !t.is_empty());

        if !token_present {
            anyhow::bail!(
                "\nCRITICAL: Admin authentication is enabled but no token is configured!\n\
                 ===================================================================\n\
                 Configure a shared bearer token:\n\
                 export SESSION_SIGNAL__SECURITY__ADMIN_AUTH_TOKEN=\"$(openssl rand -hex 32)\"\n\
                 \n\
                 To disable admin auth (NOT recommended), set:\n\
                 export SESSION_SIGNAL__SECURITY__REQUIRE_ADMIN_AUTH=false\n\
                 ===================================================================\n"
            );
        }

        if let Some(token) = &config.security.admin_auth_token {
            if token.len() < 16 {
                eprintln!(
                    "\nWARNING: Admin auth token is very short ({} chars).\n\
                     Recommended: At least 32 characters.\n\
                     Generate a strong token: openssl rand -hex 32\n",
                    token.len()
                );
            }
        }
    } else if is_prod {
        eprintln!(
            "\nSECURITY WARNING: Admin Authentication Disabled in Production!\n\
             ===================================================================\n\
             /v1/admin/* and /v1/metrics are publicly readable and list active\n\
             participants and rooms.\n\
             \n\
             To enable admin authentication:\n\
             export SESSION_SIGNAL__SECURITY__REQUIRE_ADMIN_AUTH=true\n\
             export SESSION_SIGNAL__SECURITY__ADMIN_AUTH_TOKEN=\"$(openssl rand -hex 32)\"\n\
             ===================================================================\n"
        );
    }

    if config.security.max_message_size == 0 {
        anyhow::bail!("security.max_message_size must be greater than zero");
    }

    if config.server.room_cleanup_interval == 0 {
        anyhow::bail!("server.room_cleanup_interval must be at least 1 second");
    }

    if config.protocol.max_participant_id_length == 0 || config.protocol.max_display_name_length == 0
    {
        anyhow::bail!("protocol length limits must be greater than zero");
    }

    config.websocket.validate()?;

    Ok(())
}

/// Detect if we're running in production mode.
///
/// Checks `SESSION_SIGNAL__ENVIRONMENT`, then the generic `PRODUCTION` / `PROD` variables.
pub fn is_production_mode() -> bool {
    use std::env;

    if let Ok(mode) = env::var("SESSION_SIGNAL__ENVIRONMENT") {
        let mode = mode.to_lowercase();
        return mode == "production" || mode == "prod";
    }

    env::var("SESSION_SIGNAL_PRODUCTION").is_ok()
        || env::var("PRODUCTION").is_ok()
        || env::var("PROD").is_ok()
}

//! `hgrid login` / `hgrid logout`: credential storage.

use std::io::{self, IsTerminal, Write};

use hourgrid_client::{delete_auth, save_auth, AuthCredentials, HoursClient};
use hourgrid_config::Settings;
use hourgrid_core::{BackendError, EntryBackend};

use crate::exit_codes::*;
use crate::CliError;

pub fn cmd_login(settings: &Settings, token: Option<String>, api_base: Option<String>) -> Result<(), CliError> {
    // Resolve token: --token flag / HOURGRID_TOKEN env > interactive prompt
    let token = match token {
        Some(t) => t,
        None if io::stdin().is_terminal() => prompt_token()?,
        None => {
            return Err(CliError::usage("No token provided and stdin is not a TTY")
                .with_hint("pass --token or set HOURGRID_TOKEN"));
        }
    };
    let api_base = api_base.unwrap_or_else(|| settings.api_base_url.clone());
    let mut creds = AuthCredentials::new(token, api_base);

    // Verify against the configured context when there is one.
    if let Some(context) = &settings.category_context {
        let client = HoursClient::new(creds.clone(), settings.request_timeout())?;
        client.list_categories(context).map_err(|e| match e {
            BackendError::NotAuthenticated => CliError::new(EXIT_NOT_AUTH, "Invalid API token"),
            BackendError::Network(msg) => {
                CliError::new(EXIT_NETWORK, format!("Cannot reach {}: {}", creds.api_base, msg))
            }
            other => CliError::from(other),
        })?;
        creds.verified_context = Some(context.clone());
    }

    let path = save_auth(&creds).map_err(|e| CliError::new(EXIT_ERROR, e))?;
    log::debug!("saved credentials to {}", path.display());
    eprintln!("Logged in to {}", creds.api_base);
    Ok(())
}

pub fn cmd_logout() -> Result<(), CliError> {
    let removed = delete_auth().map_err(|e| CliError::new(EXIT_ERROR, e))?;
    if removed {
        eprintln!("Logged out");
    } else {
        eprintln!("Not logged in");
    }
    Ok(())
}

fn prompt_token() -> Result<String, CliError> {
    eprint!("API token: ");
    io::stderr().flush().ok();
    let mut buf = String::new();
    io::stdin()
        .read_line(&mut buf)
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    let trimmed = buf.trim().to_string();
    if trimmed.is_empty() {
        return Err(CliError::usage("No token provided").with_hint("pass --token or set HOURGRID_TOKEN"));
    }
    Ok(trimmed)
}

//! The API token `hgrid login` leaves behind for later commands.
//!
//! Lives next to settings.json as `hourgrid/auth.json`. Owner-only
//! permissions on Unix since it holds a bearer token.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const AUTH_FILE: &str = "hourgrid/auth.json";

/// Token plus the API it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCredentials {
    pub token: String,
    /// Hours API root, e.g. "https://hours.example.com"
    pub api_base: String,
    /// Category context the token was checked against at login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_context: Option<String>,
}

impl AuthCredentials {
    pub fn new(token: String, api_base: String) -> Self {
        Self { token, api_base, verified_context: None }
    }
}

pub fn auth_file_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join(AUTH_FILE))
}

/// Token saved by the last `hgrid login`, if any.
///
/// A missing file means "not logged in"; an unparsable one is logged and
/// treated the same way.
pub fn load_auth() -> Option<AuthCredentials> {
    load_auth_from(&auth_file_path()?)
}

pub fn load_auth_from(path: &Path) -> Option<AuthCredentials> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text)
        .map_err(|e| log::warn!("{} is not a valid token file ({}), ignoring it", path.display(), e))
        .ok()
}

/// Write the token file, returning where it went.
pub fn save_auth(creds: &AuthCredentials) -> Result<PathBuf, String> {
    let path = auth_file_path().ok_or("no per-user config directory on this system")?;
    save_auth_to(&path, creds)?;
    Ok(path)
}

pub fn save_auth_to(path: &Path, creds: &AuthCredentials) -> Result<(), String> {
    let text = serde_json::to_string_pretty(creds).map_err(|e| format!("cannot encode token file: {}", e))?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_error("create", dir, e))?;
    }
    std::fs::write(path, text).map_err(|e| io_error("write", path, e))?;
    restrict_to_owner(path).map_err(|e| io_error("chmod", path, e))
}

/// Remove the token file. `Ok(false)` when there was nothing to remove.
pub fn delete_auth() -> Result<bool, String> {
    match auth_file_path() {
        Some(path) => delete_auth_at(&path),
        None => Ok(false),
    }
}

fn delete_auth_at(path: &Path) -> Result<bool, String> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error("remove", path, e)),
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn io_error(action: &str, path: &Path, err: io::Error) -> String {
    format!("cannot {} {}: {}", action, path.display(), err)
}

//! Credentials-file login.
//!
//! Passwords are stored as `<salt>$<sha256-hex(salt + password)>`. Unknown users and
//! wrong passwords fail with the same [`PainelError::Auth`].

use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{PainelError, Result};
use crate::models::{Identity, Role, MANAGEMENT};

pub const PASSWORD_ENV: &str = "PAINEL_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Display name; also the value matched against salesperson columns.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub password: String,
}

impl UserRecord {
    pub fn identity(&self) -> Identity {
        let role = Role::from_name(self.role.as_deref().unwrap_or(&self.name));
        Identity::new(&self.name, role)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub users: BTreeMap<String, UserRecord>,
}

pub fn hash_with_salt(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{salt}${}", hex::encode(hasher.finalize()))
}

/// Hash with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::thread_rng().gen();
    hash_with_salt(&hex::encode(salt), password)
}

pub fn verify_password(stored: &str, password: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, _)) => hash_with_salt(salt, password) == stored,
        None => false,
    }
}

pub fn load_credentials(path: &Path) -> Result<Credentials> {
    if !path.exists() {
        return Err(PainelError::Settings(format!(
            "arquivo de credenciais não encontrado: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        PainelError::Settings(format!("credenciais inválidas em {}: {e}", path.display()))
    })
}

pub fn save_credentials(path: &Path, credentials: &Credentials) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(credentials)
        .map_err(|e| PainelError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn authenticate(credentials: &Credentials, username: &str, password: &str) -> Result<Identity> {
    let record = credentials
        .users
        .get(username.trim())
        .filter(|r| verify_password(&r.password, password));
    match record {
        Some(r) => {
            tracing::info!(user = username.trim(), "login ok");
            Ok(r.identity())
        }
        None => {
            tracing::warn!(user = username.trim(), "login failed");
            Err(PainelError::Auth)
        }
    }
}

/// Password from `PAINEL_PASSWORD`, or typed at a hidden prompt.
pub fn read_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(pw));
    }
    Ok(Zeroizing::new(rpassword::prompt_password(prompt)?))
}

/// Prompt (or read the environment) and check the password for `username`.
pub fn login(credentials_path: &Path, username: &str) -> Result<Identity> {
    let credentials = load_credentials(credentials_path)?;
    let password = read_password("Senha: ")?;
    authenticate(&credentials, username, &password)
}

/// Users created by `painel demo`; each password is the username followed by "123".
pub fn demo_credentials() -> Credentials {
    let mut users = BTreeMap::new();
    for (username, name, role) in [
        ("ana", "Ana", None),
        ("bruno", "Bruno", None),
        ("carla", "Carla", None),
        ("gerencia", MANAGEMENT, Some(MANAGEMENT)),
    ] {
        users.insert(
            username.to_string(),
            UserRecord {
                name: name.to_string(),
                role: role.map(String::from),
                password: hash_password(&format!("{username}123")),
            },
        );
    }
    Credentials { users }
}

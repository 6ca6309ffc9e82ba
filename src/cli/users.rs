use std::path::Path;

use comfy_table::{Cell, Table};

use crate::auth::{
    hash_password, load_credentials, read_password, save_credentials, Credentials, UserRecord,
};
use crate::error::{PainelError, Result};
use crate::settings::load_settings;

pub fn hash() -> Result<()> {
    let password = read_password("Nova senha: ")?;
    if password.is_empty() {
        return Err(PainelError::Other("senha vazia".into()));
    }
    println!("{}", hash_password(&password));
    Ok(())
}

pub fn add(username: &str, name: &str, role: Option<String>) -> Result<()> {
    let settings = load_settings();
    let path = Path::new(&settings.credentials);
    let mut credentials = if path.exists() {
        load_credentials(path)?
    } else {
        Credentials::default()
    };

    let password = read_password(&format!("Senha para {username}: "))?;
    if password.is_empty() {
        return Err(PainelError::Other("senha vazia".into()));
    }
    let record = UserRecord {
        name: name.trim().to_string(),
        role,
        password: hash_password(&password),
    };
    let identity = record.identity();
    let replaced = credentials
        .users
        .insert(username.trim().to_string(), record)
        .is_some();
    save_credentials(path, &credentials)?;

    let verb = if replaced { "Atualizado" } else { "Adicionado" };
    println!("{verb}: {username} ({}, {})", identity.name, identity.role.label());
    Ok(())
}

pub fn list() -> Result<()> {
    let settings = load_settings();
    let credentials = load_credentials(Path::new(&settings.credentials))?;
    let mut table = Table::new();
    table.set_header(vec!["Usuário", "Nome", "Perfil"]);
    for (username, record) in &credentials.users {
        let identity = record.identity();
        table.add_row(vec![
            Cell::new(username),
            Cell::new(&identity.name),
            Cell::new(identity.role.label()),
        ]);
    }
    println!("Usuários\n{table}");
    Ok(())
}

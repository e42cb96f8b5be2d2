//! Login command handlers
//!
//! Logins are created by the launcher's auth flow; the CLI can only list,
//! select and forget them.

use anyhow::{bail, Result};
use uuid::Uuid;

use berth_core::DataStore;

use crate::output::{LoginRow, Output};

pub fn list(store: &DataStore, output: &Output) -> Result<()> {
    let selected = store.selected_login_id();
    let rows: Vec<LoginRow> = store
        .logins()
        .iter()
        .map(|login| LoginRow::new(login, Some(login.user_id) == selected))
        .collect();

    output.print_logins(&rows);
    Ok(())
}

pub fn select(store: &mut DataStore, id: String, output: &Output) -> Result<()> {
    let user_id = parse_user_id(&id, store, output)?;
    store.set_selected_login_id(Some(user_id))?;

    output.success(&format!("Selected login: {}", user_id));
    Ok(())
}

pub fn deselect(store: &mut DataStore, output: &Output) -> Result<()> {
    store.set_selected_login_id(None)?;
    output.success("Cleared login selection");
    Ok(())
}

/// Forget a login; clears the selection if it was selected
pub fn remove(store: &mut DataStore, id: String, output: &Output) -> Result<()> {
    let user_id = parse_user_id(&id, store, output)?;
    let removed = store.remove_login(&user_id)?;
    store.commit();

    match removed {
        Some(login) => output.success(&format!("Removed login: {}", login.username)),
        None => output.message(&format!("No login stored for {}", user_id)),
    }
    Ok(())
}

/// Parse a full user id or a unique prefix of a stored one
fn parse_user_id(id: &str, store: &DataStore, output: &Output) -> Result<Uuid> {
    // Try full UUID first
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    let matches: Vec<_> = store
        .logins()
        .iter()
        .filter(|l| l.user_id.to_string().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No login found matching: {}", id),
        1 => Ok(matches[0].user_id),
        _ => {
            if !output.is_quiet() {
                eprintln!("Multiple logins match '{}':", id);
                for login in &matches {
                    eprintln!("  {} - {}", login.user_id, login.username);
                }
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

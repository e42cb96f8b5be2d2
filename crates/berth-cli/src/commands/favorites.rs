//! Favorite server command handlers

use anyhow::{bail, Result};

use berth_core::{DataStore, FavoriteServer};

use crate::output::Output;

pub fn list(store: &DataStore, output: &Output) -> Result<()> {
    output.print_favorites(store.favorites().iter());
    Ok(())
}

/// Add a favorite; an address that is already a favorite is an error
pub fn add(store: &mut DataStore, address: String, name: String, output: &Output) -> Result<()> {
    store
        .favorites_mut()
        .add(FavoriteServer::new(address.clone(), name))?;
    store.commit();

    output.success(&format!("Added favorite: {}", address));
    Ok(())
}

/// Rename a favorite in place
pub fn rename(store: &mut DataStore, address: String, name: String, output: &Output) -> Result<()> {
    if !store.favorites().contains_key(&address) {
        bail!("No favorite server with address: {}", address);
    }

    let changed = store
        .favorites_mut()
        .modify(&address, |fav| fav.set_name(name.clone()))?;
    store.commit();

    if changed {
        output.success(&format!("Renamed {} to {}", address, name));
    } else {
        output.message(&format!("{} is already named {}", address, name));
    }
    Ok(())
}

pub fn remove(store: &mut DataStore, address: String, output: &Output) -> Result<()> {
    match store.favorites_mut().remove_by_key(&address) {
        Some(_) => {
            store.commit();
            output.success(&format!("Removed favorite: {}", address));
        }
        None => output.message(&format!("{} was not a favorite", address)),
    }
    Ok(())
}

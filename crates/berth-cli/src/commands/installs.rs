//! Installed content and engine listings

use anyhow::Result;

use berth_core::DataStore;

use crate::output::Output;

pub fn list_content(store: &DataStore, output: &Output) -> Result<()> {
    output.print_server_content(store.server_content().iter());
    Ok(())
}

pub fn list_engines(store: &DataStore, output: &Output) -> Result<()> {
    output.print_engines(store.engine_installations().iter());
    Ok(())
}

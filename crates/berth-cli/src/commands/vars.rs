//! Variable command handlers

use anyhow::{bail, Result};

use berth_core::DataStore;

use crate::output::{Output, VarRow};

/// List every registered variable
pub fn list(store: &DataStore, output: &Output) -> Result<()> {
    let rows: Vec<VarRow> = store
        .registry()
        .definitions()
        .map(|def| VarRow {
            name: def.name,
            kind: def.kind.to_string(),
            value: store
                .value_by_name(def.name)
                .cloned()
                .unwrap_or_else(|| def.default.clone()),
            default: def.default.clone(),
        })
        .collect();

    output.print_vars(&rows);
    Ok(())
}

/// Print one variable
pub fn get(store: &DataStore, name: String, output: &Output) -> Result<()> {
    let Some(value) = store.value_by_name(&name) else {
        bail!(
            "Unknown variable '{}'. Run `berth vars` to list known variables.",
            name
        );
    };

    output.print_value(&name, value);
    Ok(())
}

/// Set one variable from text
pub fn set(store: &mut DataStore, name: String, value: String, output: &Output) -> Result<()> {
    let changed = store.set_from_str(&name, &value)?;
    store.commit();

    if changed {
        output.success(&format!("Set {} = {}", name, value));
    } else {
        output.message(&format!("{} already set to {}", name, value));
    }
    Ok(())
}

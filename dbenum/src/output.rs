//! Rendering of run results for stdout.

use dbenum_core::{EnumerationResult, Result, models::AdapterDescriptor};

/// Renders an enumeration result as indented JSON.
///
/// # Errors
/// Returns error if serialization fails
pub fn render_result(result: &EnumerationResult) -> Result<String> {
    result.to_json_pretty()
}

/// Renders the adapter table printed by `list`, in registry order.
pub fn render_adapter_list(descriptors: &[AdapterDescriptor]) -> String {
    let key_width = descriptors
        .iter()
        .map(|d| d.key.len())
        .chain(std::iter::once("KEY".len()))
        .max()
        .unwrap_or_default();
    let name_width = descriptors
        .iter()
        .map(|d| d.name.len())
        .chain(std::iter::once("NAME".len()))
        .max()
        .unwrap_or_default();

    let mut lines = vec![format!(
        "{:<key_width$}  {:<name_width$}  {:<11}  PORT",
        "KEY", "NAME", "KIND"
    )];
    lines.extend(descriptors.iter().map(|d| {
        format!(
            "{:<key_width$}  {:<name_width$}  {:<11}  {}",
            d.key,
            d.name,
            d.kind.to_string(),
            d.default_port
        )
    }));
    lines.join("\n")
}

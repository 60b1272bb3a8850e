//! Table helpers shared by the subcommands.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Render an applicability pair the way the admin UI does: empty lists
/// mean "all users".
pub fn format_applicable(users: &[String], groups: &[String]) -> String {
    if users.is_empty() && groups.is_empty() {
        return "all".to_owned();
    }
    let mut parts: Vec<String> = users.iter().cloned().collect();
    parts.extend(groups.iter().map(|group| format!("{group} (group)")));
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_applicability_means_all() {
        assert_eq!(format_applicable(&[], &[]), "all");
        assert_eq!(
            format_applicable(&["alice".into()], &["staff".into()]),
            "alice, staff (group)"
        );
    }
}

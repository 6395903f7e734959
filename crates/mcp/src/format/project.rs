use crate::project_config::ProjectConfig;

const NOT_SET: &str = "Not set";

pub fn format_project_config(config: &ProjectConfig) -> String {
    let list = |items: &[String]| {
        if items.is_empty() {
            "None".to_string()
        } else {
            items.join(", ")
        }
    };

    let settings = if config.settings.is_empty() {
        "  (none)".to_string()
    } else {
        let mut entries: Vec<_> = config.settings.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(key, value)| format!("  {}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Project configuration for {}\n\nDisplay name: {}\nDefault issue type: {}\nDefault assignee: {}\nLabels: {}\nComponents: {}\nSettings:\n{}",
        config.project_key,
        config.display_name.as_deref().unwrap_or(NOT_SET),
        config.default_issue_type.as_deref().unwrap_or(NOT_SET),
        config.default_assignee.as_deref().unwrap_or(super::issue::UNASSIGNED),
        list(&config.labels),
        list(&config.components),
        settings,
    )
}

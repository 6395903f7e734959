// Plain-text rendering of issue tracker entities

use super::adf;
use crate::jira::{CreatedIssue, Issue, Pagination, SearchPage};

pub const UNASSIGNED: &str = "Unassigned";
pub const NO_PRIORITY: &str = "None";
pub const UNKNOWN: &str = "Unknown";
pub const NO_DESCRIPTION: &str = "No description provided.";
pub const NO_RESULTS: &str = "No issues found.";
pub const NO_SUMMARY: &str = "(no summary)";

fn summary(issue: &Issue) -> &str {
    let summary = issue.fields.summary.trim();
    if summary.is_empty() {
        NO_SUMMARY
    } else {
        summary
    }
}

/// Full view of one issue.
pub fn format_issue(issue: &Issue) -> String {
    let fields = &issue.fields;
    let description = fields
        .description
        .as_ref()
        .map(adf::to_plain_text)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    format!(
        "{}: {}\n\nStatus: {}\nType: {}\nPriority: {}\nAssignee: {}\nReporter: {}\nCreated: {}\nUpdated: {}\n\nDescription:\n{}",
        issue.key,
        summary(issue),
        fields.status.name,
        fields.issue_type.as_ref().map_or(UNKNOWN, |t| t.name.as_str()),
        fields.priority.as_ref().map_or(NO_PRIORITY, |p| p.name.as_str()),
        fields.assignee.as_ref().map_or(UNASSIGNED, |u| u.display_name.as_str()),
        fields.reporter.as_ref().map_or(UNKNOWN, |u| u.display_name.as_str()),
        fields.created,
        fields.updated,
        description,
    )
}

/// One compact line per issue, for result lists.
pub fn format_issue_line(issue: &Issue) -> String {
    let fields = &issue.fields;
    format!(
        "- {}: {} [{}] (Priority: {}, Assignee: {})",
        issue.key,
        summary(issue),
        fields.status.name,
        fields.priority.as_ref().map_or(NO_PRIORITY, |p| p.name.as_str()),
        fields.assignee.as_ref().map_or(UNASSIGNED, |u| u.display_name.as_str()),
    )
}

pub fn format_search_page(page: &SearchPage) -> String {
    if page.issues.is_empty() {
        return NO_RESULTS.to_string();
    }

    let shown = page.issues.len();
    let header = match page.pagination() {
        Pagination::Complete => format!("Found {} issue(s)", shown),
        Pagination::Truncated { total: Some(total) } => {
            format!("Showing {} of {} (more available)", shown, total)
        }
        Pagination::Truncated { total: None } => format!("Showing {} (more available)", shown),
        Pagination::Unknown => format!("Found {} issue(s) (more may be available)", shown),
    };

    let lines: Vec<String> = page.issues.iter().map(format_issue_line).collect();
    format!("{}\n\n{}", header, lines.join("\n"))
}

pub fn format_created_issue(created: &CreatedIssue, browse_url: &str) -> String {
    format!("Created issue {} (id {})\n{}", created.key, created.id, browse_url)
}

pub fn format_issue_updated(key: &str, fields: &[&str]) -> String {
    format!("Updated issue {}. Fields changed: {}", key, fields.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::{AdfNode, IssueFields, NamedValue, User};
    use serde_json::json;

    fn complete_issue() -> Issue {
        Issue {
            id: Some("10001".to_string()),
            key: "PROJ-42".to_string(),
            fields: IssueFields {
                summary: "Checkout: totals are wrong".to_string(),
                status: NamedValue {
                    name: "In Progress".to_string(),
                },
                priority: Some(NamedValue {
                    name: "High".to_string(),
                }),
                assignee: Some(User {
                    display_name: "Ada Lovelace".to_string(),
                }),
                reporter: Some(User {
                    display_name: "Grace Hopper".to_string(),
                }),
                issue_type: Some(NamedValue {
                    name: "Bug".to_string(),
                }),
                description: Some(
                    serde_json::from_value::<AdfNode>(json!({
                        "type": "doc",
                        "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "Totals double count tax." }] }]
                    }))
                    .unwrap(),
                ),
                created: "2024-03-01T10:00:00.000+0000".to_string(),
                updated: "2024-03-02T11:30:00.000+0000".to_string(),
            },
        }
    }

    fn bare_issue(key: &str) -> Issue {
        let mut issue = complete_issue();
        issue.key = key.to_string();
        issue.fields.priority = None;
        issue.fields.assignee = None;
        issue.fields.reporter = None;
        issue.fields.issue_type = None;
        issue.fields.description = None;
        issue
    }

    /// Recover key, summary and status from formatted text.
    fn parse_essentials(text: &str) -> (String, String, String) {
        let mut lines = text.lines();
        let (key, summary) = lines.next().unwrap().split_once(": ").unwrap();
        let status = text
            .lines()
            .find_map(|line| line.strip_prefix("Status: "))
            .unwrap();
        (key.to_string(), summary.to_string(), status.to_string())
    }

    #[test]
    fn test_format_issue_round_trip() {
        let issue = complete_issue();
        let text = format_issue(&issue);

        let (key, summary, status) = parse_essentials(&text);
        assert_eq!(key, issue.key);
        assert_eq!(summary, issue.fields.summary);
        assert_eq!(status, issue.fields.status.name);
        assert!(text.contains("2024-03-01T10:00:00.000+0000"));
        assert!(text.contains("2024-03-02T11:30:00.000+0000"));
        assert!(text.contains("Totals double count tax."));
    }

    #[test]
    fn test_format_issue_is_idempotent() {
        let issue = complete_issue();
        assert_eq!(format_issue(&issue), format_issue(&issue));
    }

    #[test]
    fn test_format_issue_placeholders() {
        let text = format_issue(&bare_issue("PROJ-1"));

        assert!(text.contains("Assignee: Unassigned"));
        assert!(text.contains("Priority: None"));
        assert!(text.contains("Type: Unknown"));
        assert!(text.ends_with("Description:\nNo description provided."));
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_blank_description_uses_placeholder() {
        let mut issue = bare_issue("PROJ-1");
        issue.fields.description = Some(AdfNode {
            node_type: "doc".to_string(),
            text: None,
            content: Vec::new(),
            attrs: None,
        });
        assert!(format_issue(&issue).ends_with(NO_DESCRIPTION));
    }

    #[test]
    fn test_blank_summary_uses_placeholder() {
        let mut issue = bare_issue("PROJ-2");
        issue.fields.summary = "  ".to_string();

        assert!(format_issue(&issue).starts_with("PROJ-2: (no summary)\n"));
        assert!(format_issue_line(&issue).starts_with("- PROJ-2: (no summary) ["));
    }

    #[test]
    fn test_empty_search_page() {
        let page = SearchPage {
            issues: Vec::new(),
            total: Some(0),
            is_last: Some(true),
            next_page_token: None,
        };
        assert_eq!(format_search_page(&page), "No issues found.");
    }

    #[test]
    fn test_search_page_headers() {
        let issues = vec![complete_issue(), bare_issue("PROJ-7")];
        let page = |total, is_last| SearchPage {
            issues: issues.clone(),
            total,
            is_last,
            next_page_token: None,
        };

        let complete = format_search_page(&page(None, Some(true)));
        assert!(complete.starts_with("Found 2 issue(s)\n\n"));
        assert!(complete.contains(
            "- PROJ-42: Checkout: totals are wrong [In Progress] (Priority: High, Assignee: Ada Lovelace)"
        ));
        assert!(complete.contains("- PROJ-7: Checkout: totals are wrong [In Progress] (Priority: None, Assignee: Unassigned)"));

        let truncated = format_search_page(&page(Some(57), None));
        assert!(truncated.starts_with("Showing 2 of 57 (more available)"));

        let open_ended = format_search_page(&page(None, Some(false)));
        assert!(open_ended.starts_with("Showing 2 (more available)"));

        let unknown = format_search_page(&page(None, None));
        assert!(unknown.starts_with("Found 2 issue(s) (more may be available)"));
    }

    #[test]
    fn test_created_and_updated_messages() {
        let created = CreatedIssue {
            id: "10005".to_string(),
            key: "PROJ-5".to_string(),
        };
        assert_eq!(
            format_created_issue(&created, "https://acme.atlassian.net/browse/PROJ-5"),
            "Created issue PROJ-5 (id 10005)\nhttps://acme.atlassian.net/browse/PROJ-5"
        );
        assert_eq!(
            format_issue_updated("PROJ-5", &["labels", "summary"]),
            "Updated issue PROJ-5. Fields changed: labels, summary"
        );
    }
}

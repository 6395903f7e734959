// Pure formatters turning validated entities into plain text

pub mod adf;
pub mod issue;
pub mod project;

pub use issue::{
    format_created_issue, format_issue, format_issue_line, format_issue_updated, format_search_page,
};
pub use project::format_project_config;

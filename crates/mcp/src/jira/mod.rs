pub mod client;
pub mod types;

pub use client::{classify_response, JiraClient, NewIssue};
pub use types::{AdfNode, CreatedIssue, Issue, IssueFields, NamedValue, Pagination, SearchPage, User};

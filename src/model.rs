//! Typed views of the GitHub issue and comment payloads.
//!
//! The `*Record` structs mirror the wire shape of the list endpoints, with
//! every field the API may omit or null marked optional. Normalization into
//! [`Issue`] and [`Comment`] happens once, right after deserialization, so
//! the rest of the pipeline never sees a missing field.

use serde::Deserialize;

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_state() -> String {
    "closed".to_string()
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Milestone {
    pub title: String,
}

/// Issue record as returned by the repository issue list endpoint.
///
/// `created_at` and `updated_at` are required; a record without them is
/// structurally invalid and the deserialization error propagates.
#[derive(Debug, Deserialize)]
pub struct IssueRecord {
    #[serde(default)]
    pub number: u64,
    #[serde(default = "default_title")]
    pub title: String,
    pub body: Option<String>,
    #[serde(default = "default_state")]
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
    pub user: Option<User>,
    pub assignee: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub comments_url: String,
    /// Present on pull requests only.
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRecord {
    pub id: u64,
    pub body: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub user: Option<User>,
}

/// A fully normalized issue. Optional upstream fields collapse to the empty
/// string; only the first label is kept.
#[derive(Debug)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
    pub author: String,
    pub assignee: String,
    pub label: String,
    pub milestone: String,
    pub is_pr: bool,
    pub comments: Vec<Comment>,
}

impl Issue {
    pub fn from_record(record: IssueRecord, comments: Vec<Comment>) -> Self {
        Self {
            number: record.number,
            title: record.title,
            body: record.body.unwrap_or_default(),
            state: record.state,
            created_at: record.created_at,
            updated_at: record.updated_at,
            author: record.user.map(|u| u.login).unwrap_or_default(),
            assignee: record.assignee.map(|u| u.login).unwrap_or_default(),
            label: record
                .labels
                .into_iter()
                .next()
                .map(|l| l.name)
                .unwrap_or_default(),
            milestone: record.milestone.map(|m| m.title).unwrap_or_default(),
            is_pr: record.pull_request.is_some(),
            comments,
        }
    }
}

#[derive(Debug)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CommentRecord> for Comment {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.id,
            body: record.body.unwrap_or_default(),
            author: record.user.map(|u| u.login).unwrap_or_default(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

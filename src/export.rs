//! BitBucket import document types and the GitHub to BitBucket translation.
//!
//! Struct fields are declared in alphabetical order so the serialized
//! document comes out with deterministically sorted keys.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model;

const PR_TITLE_TAG: &str = "[PR] ";
const DEFAULT_KIND: &str = "enhancement";
// trivial, minor, major, critical, blocker
const DEFAULT_PRIORITY: &str = "minor";

fn status_for_state(state: &str) -> &'static str {
    match state {
        "open" => "open",
        "closed" => "resolved",
        _ => "open",
    }
}

fn kind_for_label(label: &str) -> &'static str {
    match label {
        "bug" => "bug",
        "enhancement" | "feature" | "cleanup" | "workflow" | "graphics" | "content" => {
            "enhancement"
        }
        "question/comment" => "proposal",
        _ => DEFAULT_KIND,
    }
}

#[derive(Debug, Serialize)]
pub struct Issue {
    pub assignee: String,
    pub content: String,
    pub content_updated_on: String,
    pub created_on: String,
    pub id: u64,
    pub kind: &'static str,
    pub milestone: String,
    pub priority: &'static str,
    pub reporter: String,
    pub status: &'static str,
    pub title: String,
    pub updated_on: String,
}

#[derive(Debug, Serialize)]
pub struct Comment {
    pub content: String,
    pub created_on: String,
    pub id: u64,
    pub issue: u64,
    pub updated_on: String,
    pub user: String,
}

/// Maps one source issue to its import-side issue and comments.
///
/// Pull requests take the author as assignee; the upstream assignee field
/// carries no meaning for them.
pub fn translate(issue: &model::Issue) -> (Issue, Vec<Comment>) {
    let assignee = if issue.is_pr {
        issue.author.clone()
    } else {
        issue.assignee.clone()
    };
    let title = if issue.is_pr {
        format!("{PR_TITLE_TAG}{}", issue.title)
    } else {
        issue.title.clone()
    };

    let target = Issue {
        assignee,
        content: issue.body.clone(),
        content_updated_on: issue.updated_at.clone(),
        created_on: issue.created_at.clone(),
        id: issue.number,
        kind: kind_for_label(&issue.label),
        milestone: issue.milestone.clone(),
        priority: DEFAULT_PRIORITY,
        reporter: issue.author.clone(),
        status: status_for_state(&issue.state),
        title,
        updated_on: issue.updated_at.clone(),
    };
    let comments = issue
        .comments
        .iter()
        .map(|comment| Comment {
            content: comment.body.clone(),
            created_on: comment.created_at.clone(),
            id: comment.id,
            issue: issue.number,
            updated_on: comment.updated_at.clone(),
            user: comment.author.clone(),
        })
        .collect();
    (target, comments)
}

#[derive(Debug, Serialize)]
pub struct MilestoneRef {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub default_kind: &'static str,
}

/// The complete import unit.
#[derive(Debug, Serialize)]
pub struct Document {
    pub attachments: Vec<serde_json::Value>,
    pub comments: Vec<Comment>,
    pub components: Vec<serde_json::Value>,
    pub issues: Vec<Issue>,
    pub logs: Vec<serde_json::Value>,
    pub meta: Meta,
    pub milestones: Vec<MilestoneRef>,
    pub versions: Vec<serde_json::Value>,
}

impl Document {
    /// Translates every issue and collects the document, including the
    /// deduplicated list of non-empty milestone names.
    pub fn assemble(issues: &[model::Issue]) -> Document {
        let mut target_issues = Vec::with_capacity(issues.len());
        let mut target_comments = Vec::new();
        for issue in issues {
            let (target, comments) = translate(issue);
            target_issues.push(target);
            target_comments.extend(comments);
        }

        let milestones: BTreeSet<&str> = issues
            .iter()
            .map(|issue| issue.milestone.as_str())
            .filter(|name| !name.is_empty())
            .collect();

        Document {
            attachments: Vec::new(),
            comments: target_comments,
            components: Vec::new(),
            issues: target_issues,
            logs: Vec::new(),
            meta: Meta {
                default_kind: DEFAULT_KIND,
            },
            milestones: milestones
                .into_iter()
                .map(|name| MilestoneRef {
                    name: name.to_string(),
                })
                .collect(),
            versions: Vec::new(),
        }
    }
}

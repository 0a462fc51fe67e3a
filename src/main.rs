use std::io::Write;

use anyhow::{bail, Result};
use argh::FromArgs;
use headers::authorization::Basic;
use headers::Authorization;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cache;
mod export;
mod github;
mod model;

use cache::PageCache;
use github::Github;

const CACHE_DIR: &str = ".issuedata_cache";

/// Migrate GitHub issue data to import-ready BitBucket issue data.
#[derive(FromArgs, Debug)]
struct Args {
    /// name of the organization that owns the GitHub repo
    #[argh(option, short = 'o')]
    org: String,

    /// name of the GitHub repo
    #[argh(option, short = 'r')]
    repo: String,

    /// username to authenticate requests
    #[argh(option, short = 'u')]
    username: Option<String>,

    /// password to authenticate requests
    #[argh(option, short = 'p')]
    password: Option<String>,

    /// directory for cached responses
    #[argh(option, default = "String::from(CACHE_DIR)")]
    cache_dir: String,
}

/// Resolves credentials from the flags, falling back to the environment.
/// Username and password must be given together or not at all.
fn authentication(args: &Args) -> Result<Option<Authorization<Basic>>> {
    let username = args
        .username
        .clone()
        .or_else(|| std::env::var("GITHUB_USERNAME").ok());
    let password = args
        .password
        .clone()
        .or_else(|| std::env::var("GITHUB_PASSWORD").ok());
    match (username, password) {
        (Some(username), Some(password)) => Ok(Some(Authorization::basic(&username, &password))),
        (None, None) => Ok(None),
        _ => bail!("must specify both username and password if authenticating"),
    }
}

async fn run(args: Args) -> Result<()> {
    let auth = authentication(&args)?;
    let cache = PageCache::open(&args.cache_dir)?;
    let mut github = Github::new(auth, cache);

    let issues = github
        .issues(&Github::issues_url(&args.org, &args.repo))
        .await?;
    info!(issues = issues.len(), "translating");
    let document = export::Document::assemble(&issues);

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    serde_json::to_writer_pretty(&mut stdout, &document)?;
    writeln!(stdout)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Args = argh::from_env();
    if let Err(err) = run(args).await {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("Caused by: {cause}");
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(username: Option<&str>, password: Option<&str>) -> Args {
        Args {
            org: "brethren".to_string(),
            repo: "game".to_string(),
            username: username.map(String::from),
            password: password.map(String::from),
            cache_dir: CACHE_DIR.to_string(),
        }
    }

    #[test]
    fn authentication_requires_both_or_neither() {
        assert!(authentication(&args(None, None)).unwrap().is_none());
        assert!(authentication(&args(Some("evan"), Some("hunter2")))
            .unwrap()
            .is_some());
        assert!(authentication(&args(Some("evan"), None)).is_err());
        assert!(authentication(&args(None, Some("hunter2"))).is_err());
    }

    #[tokio::test]
    async fn migrates_issues_and_comments_end_to_end() {
        let server = MockServer::start().await;

        // Issue 5 reports zero comments, so its comment endpoint must never
        // be requested (no mock is mounted for it).
        Mock::given(method("GET"))
            .and(path("/repos/brethren/game/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "number": 5,
                    "title": "Save file corrupt",
                    "body": "crashes on load",
                    "state": "closed",
                    "created_at": "2018-03-01T09:00:00Z",
                    "updated_at": "2018-03-04T10:00:00Z",
                    "user": {"login": "evan"},
                    "assignee": null,
                    "labels": [{"name": "bug"}],
                    "milestone": null,
                    "comments": 0,
                    "comments_url":
                        format!("{}/repos/brethren/game/issues/5/comments", server.uri()),
                },
                {
                    "number": 6,
                    "title": "Add save slots",
                    "body": "three should do",
                    "state": "open",
                    "created_at": "2018-03-02T09:00:00Z",
                    "updated_at": "2018-03-05T10:00:00Z",
                    "user": {"login": "alice"},
                    "assignee": {"login": "kara"},
                    "labels": [],
                    "milestone": null,
                    "comments": 1,
                    "comments_url":
                        format!("{}/repos/brethren/game/issues/6/comments", server.uri()),
                    "pull_request": {"url": "https://api.github.com/repos/brethren/game/pulls/6"},
                },
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/brethren/game/issues/6/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 42,
                    "body": "sounds good",
                    "created_at": "2018-03-03T09:00:00Z",
                    "updated_at": "2018-03-03T09:00:00Z",
                    "user": {"login": "evan"},
                }
            ])))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut github = Github::new(None, PageCache::open(dir.path()).unwrap());
        let issues = github
            .issues(&format!("{}/repos/brethren/game/issues", server.uri()))
            .await
            .unwrap();
        let document = export::Document::assemble(&issues);

        assert_eq!(document.issues.len(), 2);

        assert_eq!(document.issues[0].id, 5);
        assert_eq!(document.issues[0].status, "resolved");
        assert_eq!(document.issues[0].kind, "bug");
        assert_eq!(document.issues[0].title, "Save file corrupt");

        assert_eq!(document.issues[1].id, 6);
        assert_eq!(document.issues[1].title, "[PR] Add save slots");
        assert_eq!(document.issues[1].assignee, "alice");
        assert_eq!(document.issues[1].status, "open");

        assert_eq!(document.comments.len(), 1);
        assert_eq!(document.comments[0].issue, 6);
        assert_eq!(document.comments[0].user, "evan");

        assert!(document.milestones.is_empty());
    }
}

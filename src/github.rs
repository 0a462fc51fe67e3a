//! GitHub REST client: sequential paginated GETs backed by the disk cache.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use headers::authorization::Basic;
use headers::{Authorization, HeaderMapExt, UserAgent};
use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, LINK};
use hyper::{Body, Client, Method, Request};
use hyper_tls::HttpsConnector;
use tracing::debug;

use crate::cache::{Page, PageCache};
use crate::model;

const API_ENDPOINT: &str = "https://api.github.com";
const RATELIMIT_RESET: &str = "x-ratelimit-reset";

pub struct Github {
    client: Client<HttpsConnector<HttpConnector>>,
    user_agent: UserAgent,
    auth: Option<Authorization<Basic>>,
    cache: PageCache,
}

impl Github {
    pub fn new(auth: Option<Authorization<Basic>>, cache: PageCache) -> Self {
        Self {
            client: Client::builder().build(HttpsConnector::new()),
            user_agent: UserAgent::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )),
            auth,
            cache,
        }
    }

    /// First page of a repository's issue list, open and closed alike.
    pub fn issues_url(org: &str, repo: &str) -> String {
        format!("{API_ENDPOINT}/repos/{org}/{repo}/issues?state=all&per_page=100")
    }

    /// Fetches every issue reachable from `url`, along with each issue's
    /// comments. Comment endpoints are only hit for issues that report a
    /// non-zero comment count.
    pub async fn issues(&mut self, url: &str) -> Result<Vec<model::Issue>> {
        let records = self.fetch_all(url).await?;
        let mut issues = Vec::with_capacity(records.len());
        for record in records {
            let record: model::IssueRecord =
                serde_json::from_value(record).context("malformed issue record")?;
            let comments = if record.comments > 0 {
                self.comments(&record.comments_url).await?
            } else {
                Vec::new()
            };
            issues.push(model::Issue::from_record(record, comments));
        }
        Ok(issues)
    }

    async fn comments(&mut self, url: &str) -> Result<Vec<model::Comment>> {
        let records = self.fetch_all(url).await?;
        records
            .into_iter()
            .map(|record| {
                let record: model::CommentRecord =
                    serde_json::from_value(record).context("malformed comment record")?;
                Ok(record.into())
            })
            .collect()
    }

    /// Follows `rel="next"` links from `url`, concatenating the records of
    /// every page in fetch order.
    pub async fn fetch_all(&mut self, url: &str) -> Result<Vec<serde_json::Value>> {
        let mut records = Vec::new();
        let mut next = Some(url.to_string());
        while let Some(url) = next {
            let page = self.page(&url).await?;
            records.extend(page.body);
            next = page.next_url;
        }
        Ok(records)
    }

    /// One page, from the cache when present, from the network otherwise.
    async fn page(&mut self, url: &str) -> Result<Page> {
        if let Some(page) = self.cache.get(url)? {
            debug!(url, "cache");
            return Ok(page);
        }
        debug!(url, "get");
        let page = self.get(url).await?;
        self.cache.put(url, &page)?;
        Ok(page)
    }

    async fn get(&self, url: &str) -> Result<Page> {
        let mut req = Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(Body::empty())?;
        req.headers_mut().typed_insert(self.user_agent.clone());
        if let Some(auth) = &self.auth {
            req.headers_mut().typed_insert(auth.clone());
        }

        let resp = self
            .client
            .request(req)
            .await
            .with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let next_url = next_page_url(resp.headers());
        let reset = rate_limit_reset(resp.headers());
        let bytes = hyper::body::to_bytes(resp.into_body()).await?;

        if !status.is_success() {
            if let Some(reset) = reset {
                bail!(
                    "rate limit exceeded; you may make more requests again in {} minutes",
                    minutes_until(reset)
                );
            }
            bail!("{}", String::from_utf8_lossy(&bytes));
        }

        let body = serde_json::from_slice(&bytes).context("could not parse response from server")?;
        Ok(Page { body, next_url })
    }
}

/// Extracts the `rel="next"` target from a Link header, if any.
///
/// Link headers look like:
/// `<https://api.github.com/...&page=2>; rel="next", <...&page=3>; rel="last"`
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    for part in link.split(',') {
        let mut url = None;
        let mut rel = None;
        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"'));
            }
        }
        if rel == Some("next") {
            return url.map(String::from);
        }
    }
    None
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<u64> {
    headers.get(RATELIMIT_RESET)?.to_str().ok()?.parse().ok()
}

/// Wall-clock minutes until a Unix reset timestamp, saturating at zero.
fn minutes_until(reset: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    reset.saturating_sub(now) / 60
}

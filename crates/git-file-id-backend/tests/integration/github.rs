// Copyright 2026 Oxide Computer Company

use anyhow::Result;
use git_file_id::{BatchInput, IdentifierOptions, IdentifyError, MetadataSource};
use git_file_id_backend::{
    DefaultBackend, GitHubClient, GitHubConfig, LocalGit, identify,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

const FILE_SHA: &str = "95d09f2b10159347eece71399a7e2e907ea3df4f";
const COMMIT_SHA: &str = "6dcb09b5b57875f334f61aebed695e2e4193db5e";

/// A canned HTTP response.
struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl Reply {
    fn json(status: u16, body: Value) -> Self {
        Reply { status, headers: Vec::new(), body: body.to_string() }
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// A request as seen by [`FakeGitHub`].
#[derive(Clone, Debug)]
struct Seen {
    target: String,
    authorization: Option<String>,
}

/// A minimal HTTP/1.1 server standing in for the GitHub API. Each
/// connection serves one request, routed by path (without the query).
struct FakeGitHub {
    base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeGitHub {
    async fn start<F>(route: F) -> Result<Self>
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let route = Arc::new(route);

        let log = seen.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let route = route.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request).into_owned();
                    let target = request
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or_default()
                        .to_owned();
                    let authorization = request.lines().find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("authorization")
                            .then(|| value.trim().to_owned())
                    });
                    let path = target.split('?').next().unwrap_or_default().to_owned();
                    log.lock().unwrap().push(Seen { target, authorization });

                    let reply = route(&path);
                    let mut response = format!(
                        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n",
                        reply.status,
                        reply.body.len()
                    );
                    for (name, value) in &reply.headers {
                        response.push_str(&format!("{name}: {value}\r\n"));
                    }
                    response.push_str("\r\n");
                    response.push_str(&reply.body);
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Ok(FakeGitHub { base_url, seen })
    }

    fn client(&self, token: Option<&str>) -> Result<GitHubClient> {
        Ok(GitHubClient::new(GitHubConfig {
            api_url: self.base_url.clone(),
            token: token.map(str::to_owned),
            ..Default::default()
        })?)
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

/// Serves a repository `octo/widgets` containing `src/lib.rs` and a
/// directory `src`.
fn widgets(path: &str) -> Reply {
    match path {
        "/repos/octo/widgets/contents/src/lib.rs" => {
            Reply::json(200, json!({ "type": "file", "sha": FILE_SHA, "path": "src/lib.rs" }))
        }
        "/repos/octo/widgets/contents/src" => {
            Reply::json(200, json!({ "type": "dir", "sha": FILE_SHA }))
        }
        "/repos/octo/widgets/commits" => Reply::json(
            200,
            json!([{
                "sha": COMMIT_SHA,
                "commit": { "committer": { "date": "2024-01-15T12:30:00+02:00" } }
            }]),
        ),
        _ => Reply::json(404, json!({ "message": "Not Found" })),
    }
}

#[tokio::test]
async fn test_fetch_github_metadata() -> Result<()> {
    let server = FakeGitHub::start(widgets).await?;
    let client = server.client(Some("sekrit"))?;

    let raw = client.fetch("octo", "widgets", "./src/lib.rs", "main").await?;
    assert_eq!(raw.source.as_deref(), Some("github-api"));
    assert_eq!(raw.owner.as_deref(), Some("octo"));
    assert_eq!(raw.repo.as_deref(), Some("widgets"));
    assert_eq!(raw.branch.as_deref(), Some("main"));
    assert_eq!(raw.file_hash.as_deref(), Some(FILE_SHA));
    assert_eq!(raw.commit_hash.as_deref(), Some(COMMIT_SHA));
    assert_eq!(raw.file_path.as_deref(), Some("src/lib.rs"));
    assert_eq!(
        raw.html_url,
        Some(format!("https://github.com/octo/widgets/blob/{COMMIT_SHA}/src/lib.rs"))
    );
    assert_eq!(raw.repo_path, None);

    let seen = server.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].target, "/repos/octo/widgets/contents/src/lib.rs?ref=main");
    assert_eq!(
        seen[1].target,
        "/repos/octo/widgets/commits?path=src%2Flib.rs&sha=main&per_page=1"
    );
    assert!(seen.iter().all(|s| s.authorization.as_deref() == Some("token sekrit")));
    Ok(())
}

#[tokio::test]
async fn test_unauthenticated_requests_omit_token() -> Result<()> {
    let server = FakeGitHub::start(widgets).await?;
    server.client(None)?.fetch("octo", "widgets", "src/lib.rs", "main").await?;
    assert!(server.seen().iter().all(|s| s.authorization.is_none()));
    Ok(())
}

#[tokio::test]
async fn test_identify_through_default_backend() -> Result<()> {
    let server = FakeGitHub::start(widgets).await?;
    let backend = DefaultBackend::new(LocalGit::from_env()?, server.client(None)?);
    let input = BatchInput::github("octo", "widgets", "src/lib.rs");

    let file = identify(&backend, &input, &IdentifierOptions::default()).await?;
    assert_eq!(file.metadata.source(), MetadataSource::GithubApi);
    assert_eq!(file.metadata.last_modified(), "2024-01-15T10:30:00Z");
    assert_eq!(file.metadata.file_hash().to_string(), FILE_SHA);
    assert!(file.identifier.full().starts_with("sha256:"));
    assert_eq!(file.identifier.digest().len(), 64, "sha256 hex digest");
    Ok(())
}

#[tokio::test]
async fn test_missing_repository_and_file() -> Result<()> {
    let server = FakeGitHub::start(widgets).await?;
    let client = server.client(None)?;

    let err = client.fetch("octo", "nope", "src/lib.rs", "main").await.unwrap_err();
    assert!(
        matches!(&err, IdentifyError::RepositoryNotFound { path } if path == "octo/nope"),
        "unexpected error: {err}"
    );

    let err = client.fetch("octo", "widgets", "src", "main").await.unwrap_err();
    assert!(
        matches!(&err, IdentifyError::FileNotFound { file_path, .. } if file_path == "src"),
        "directories are not files: {err}"
    );
    Ok(())
}

#[tokio::test]
async fn test_no_commits_for_file() -> Result<()> {
    let server = FakeGitHub::start(|path: &str| {
        if path.ends_with("/commits") {
            Reply::json(200, json!([]))
        } else {
            widgets(path)
        }
    })
    .await?;
    let err = server
        .client(None)?
        .fetch("octo", "widgets", "src/lib.rs", "main")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentifyError::FileNotFound { .. }), "unexpected error: {err}");
    Ok(())
}

#[tokio::test]
async fn test_rate_limited() -> Result<()> {
    let server = FakeGitHub::start(|_: &str| {
        Reply::json(403, json!({ "message": "API rate limit exceeded for 127.0.0.1." }))
            .header("X-RateLimit-Remaining", "0")
            .header("X-RateLimit-Reset", "1700000000")
    })
    .await?;
    let err = server
        .client(None)?
        .fetch("octo", "widgets", "src/lib.rs", "main")
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            IdentifyError::RateLimitExceeded { reset_time: Some(1_700_000_000), remaining: 0 }
        ),
        "unexpected error: {err}"
    );
    assert_eq!(err.code(), "RATE_LIMIT_EXCEEDED");
    Ok(())
}

#[tokio::test]
async fn test_authentication_failed() -> Result<()> {
    let server = FakeGitHub::start(|_: &str| {
        Reply::json(401, json!({ "message": "Bad credentials" }))
            .header("X-RateLimit-Remaining", "59")
    })
    .await?;
    let err = server
        .client(Some("expired"))?
        .fetch("octo", "widgets", "src/lib.rs", "main")
        .await
        .unwrap_err();
    assert!(
        matches!(err, IdentifyError::AuthenticationFailed { status: 401 }),
        "unexpected error: {err}"
    );
    Ok(())
}

#[tokio::test]
async fn test_server_error() -> Result<()> {
    let server =
        FakeGitHub::start(|_: &str| Reply::json(502, json!({ "message": "Server Error" })))
            .await?;
    let err = server
        .client(None)?
        .fetch("octo", "widgets", "src/lib.rs", "main")
        .await
        .unwrap_err();
    match &err {
        IdentifyError::ApiError { status, message, .. } => {
            assert_eq!(*status, 502);
            assert_eq!(message, "Server Error");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.code(), "HTTP_502");
    Ok(())
}

#[tokio::test]
async fn test_malformed_response() -> Result<()> {
    let server = FakeGitHub::start(|_: &str| Reply {
        status: 200,
        headers: Vec::new(),
        body: "<html>not json</html>".to_owned(),
    })
    .await?;
    let err = server
        .client(None)?
        .fetch("octo", "widgets", "src/lib.rs", "main")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentifyError::ParseError { .. }), "unexpected error: {err}");
    Ok(())
}

#[tokio::test]
async fn test_connection_refused() -> Result<()> {
    // Bind and immediately release a port so that nothing is listening.
    let addr = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let client = GitHubClient::new(GitHubConfig {
        api_url: format!("http://{addr}"),
        ..Default::default()
    })?;
    let err = client.fetch("octo", "widgets", "src/lib.rs", "main").await.unwrap_err();
    assert!(
        matches!(&err, IdentifyError::NetworkError { url, .. } if url.starts_with(&format!("http://{addr}/repos/"))),
        "unexpected error: {err}"
    );
    Ok(())
}

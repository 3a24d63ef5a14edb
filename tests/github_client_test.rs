use mockito::{Matcher, Server};
use repo_mining::github::models::RateLimit;
use repo_mining::github::{GitHubClient, GitHubConfig, Repository, Resource};
use repo_mining::Error;
use std::time::Duration;

/// Client against `server` with enough quota cached to never ask `/rate_limit`
fn client(server: &Server) -> GitHubClient {
    seeded_client(server.url())
}

fn seeded_client(api_url: String) -> GitHubClient {
    let mut client = GitHubClient::new(GitHubConfig::with_api_url(api_url)).unwrap();
    let reset = chrono::Utc::now().timestamp() + 3600;
    for resource in [Resource::Core, Resource::Search] {
        client.rate_limiter_mut().set(
            resource,
            RateLimit {
                limit: 5000,
                remaining: 5000,
                reset,
            },
        );
    }
    client
}

fn repository(full_name: &str) -> Repository {
    let name = full_name.rsplit('/').next().unwrap_or_default();
    serde_json::from_value(serde_json::json!({
        "id": 1,
        "name": name,
        "full_name": full_name,
    }))
    .unwrap()
}

fn commits(n: usize) -> String {
    let items: Vec<_> = (0..n).map(|i| serde_json::json!({ "sha": i.to_string() })).collect();
    serde_json::to_string(&items).unwrap()
}

#[tokio::test]
async fn test_unknown_repository_is_none() {
    let mut server = Server::new_async().await;
    let _repo = server
        .mock("GET", "/repos/foo/gone")
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create_async()
        .await;

    let mut github = client(&server);
    assert!(github.get_repo("foo/gone").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_repo_rejects_malformed_name() {
    let server = Server::new_async().await;
    let mut github = client(&server);

    let result = github.get_repo("not-a-repo").await;
    assert!(matches!(result, Err(Error::InvalidRepoName(_))));
}

#[tokio::test]
async fn test_get_repo() {
    let mut server = Server::new_async().await;
    let _repo = server
        .mock("GET", "/repos/foo/bar")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id": 7, "name": "bar", "full_name": "foo/bar",
                "owner": {"login": "foo", "id": 3, "type": "User"},
                "default_branch": "main", "forks_count": 2}"#,
        )
        .create_async()
        .await;

    let mut github = client(&server);
    let repo = github.get_repo("foo/bar").await.unwrap().unwrap();

    assert_eq!(repo.id, 7);
    assert_eq!(repo.default_branch.as_deref(), Some("main"));

    let meta = repo.meta_data();
    assert_eq!(meta.owner_id, 3);
    assert_eq!(meta.parent_id, -1);
    assert_eq!(meta.forks_count, 2);
}

#[tokio::test]
async fn test_empty_repository_has_no_commits() {
    let mut server = Server::new_async().await;
    let _commits = server
        .mock("GET", "/repos/foo/empty/commits")
        .match_query(Matcher::Any)
        .with_status(409)
        .with_body(r#"{"message": "Git Repository is empty."}"#)
        .create_async()
        .await;

    let mut github = client(&server);
    let count = github.count_commits(&repository("foo/empty"), -1).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_count_commits_from_last_page() {
    let mut server = Server::new_async().await;
    let last_url = format!("{}/repos/foo/bar/commits?per_page=100&page=3", server.url());
    let first = server
        .mock("GET", "/repos/foo/bar/commits")
        .match_query(Matcher::Exact("per_page=100".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("link", &format!(r#"<{last_url}>; rel="last""#))
        .with_body(commits(100))
        .create_async()
        .await;
    let last = server
        .mock("GET", "/repos/foo/bar/commits")
        .match_query(Matcher::Exact("per_page=100&page=3".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(commits(5))
        .create_async()
        .await;

    let mut github = client(&server);
    let count = github.count_commits(&repository("foo/bar"), -1).await.unwrap();

    first.assert_async().await;
    last.assert_async().await;
    assert_eq!(count, 205);
}

#[tokio::test]
async fn test_count_commits_ignores_page_zero_in_link() {
    let mut server = Server::new_async().await;
    let last_url = format!("{}/repos/foo/bar/commits?per_page=100&page=0", server.url());
    let _first = server
        .mock("GET", "/repos/foo/bar/commits")
        .match_query(Matcher::Exact("per_page=100".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("link", &format!(r#"<{last_url}>; rel="last""#))
        .with_body(commits(3))
        .create_async()
        .await;

    let mut github = client(&server);
    let count = github.count_commits(&repository("foo/bar"), -1).await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_has_n_commits_stops_on_first_page() {
    let mut server = Server::new_async().await;
    let last_url = format!("{}/repos/foo/bar/commits?per_page=100&page=3", server.url());
    let _first = server
        .mock("GET", "/repos/foo/bar/commits")
        .match_query(Matcher::Exact("per_page=100".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("link", &format!(r#"<{last_url}>; rel="last""#))
        .with_body(commits(100))
        .create_async()
        .await;
    let last = server
        .mock("GET", "/repos/foo/bar/commits")
        .match_query(Matcher::Exact("per_page=100&page=3".to_string()))
        .expect(0)
        .create_async()
        .await;

    let mut github = client(&server);
    assert!(github.has_n_commits(&repository("foo/bar"), 2).await.unwrap());
    last.assert_async().await;
}

#[tokio::test]
async fn test_count_commits_zero_requested() {
    let server = Server::new_async().await;
    let mut github = client(&server);
    assert_eq!(github.count_commits(&repository("foo/bar"), 0).await.unwrap(), 0);
}

#[tokio::test]
async fn test_abuse_detection_is_retried() {
    let mut server = Server::new_async().await;
    let blocked = server
        .mock("GET", "/repos/foo/bar")
        .with_status(403)
        .with_header("retry-after", "0")
        .with_body(r#"{"message": "You have triggered an abuse detection mechanism."}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/repos/foo/bar")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 7, "name": "bar", "full_name": "foo/bar"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut github = client(&server);
    let spacing = github.suggested_spacing();
    let repo = github.get_repo("foo/bar").await.unwrap();

    blocked.assert_async().await;
    ok.assert_async().await;
    assert_eq!(repo.map(|r| r.id), Some(7));
    assert_eq!(github.suggested_spacing(), spacing * 2);
}

#[tokio::test]
async fn test_forbidden_without_retry_after_refreshes_rate_limit() {
    let mut server = Server::new_async().await;
    let reset = chrono::Utc::now().timestamp() + 3600;
    let rate_limit = server
        .mock("GET", "/rate_limit")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "resources": {
                    "core": {"limit": 5000, "remaining": 10, "reset": reset},
                    "search": {"limit": 30, "remaining": 30, "reset": reset}
                }
            })
            .to_string(),
        )
        .expect_at_least(1)
        .create_async()
        .await;
    let blocked = server
        .mock("GET", "/repos/foo/bar")
        .with_status(403)
        .with_body(r#"{"message": "API rate limit exceeded"}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/repos/foo/bar")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 7, "name": "bar", "full_name": "foo/bar"}"#)
        .expect(1)
        .create_async()
        .await;

    // Nothing cached: the first request asks `/rate_limit` for the quota
    let mut github = GitHubClient::new(GitHubConfig::with_api_url(server.url())).unwrap();
    let repo = github.get_repo("foo/bar").await.unwrap();

    rate_limit.assert_async().await;
    blocked.assert_async().await;
    ok.assert_async().await;
    assert_eq!(repo.map(|r| r.id), Some(7));
    assert_eq!(github.rate_limiter().get(Resource::Core).map(|l| l.remaining), Some(10));
}

#[tokio::test]
async fn test_connection_failure_is_retried() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Reserve a free port, then leave it closed so the first connect is refused
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before end of request");
            request.extend_from_slice(&buf[..n]);
        }

        let body = r#"{"id": 7, "name": "bar", "full_name": "foo/bar"}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });

    let mut github = seeded_client(format!("http://{addr}"));
    let repo = github.get_repo("foo/bar").await.unwrap();

    assert_eq!(repo.map(|r| r.id), Some(7));
    assert!(server.await.unwrap().starts_with("GET /repos/foo/bar "));
}

#[tokio::test]
async fn test_response_headers_update_rate_limit() {
    let mut server = Server::new_async().await;
    let _repo = server
        .mock("GET", "/repos/foo/bar")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-ratelimit-limit", "60")
        .with_header("x-ratelimit-remaining", "59")
        .with_header("x-ratelimit-reset", "1700000000")
        .with_body(r#"{"id": 7, "name": "bar", "full_name": "foo/bar"}"#)
        .create_async()
        .await;

    let mut github = client(&server);
    github.get_repo("foo/bar").await.unwrap();

    assert_eq!(
        github.rate_limiter().get(Resource::Core),
        Some(RateLimit {
            limit: 60,
            remaining: 59,
            reset: 1700000000,
        })
    );
    assert_eq!(github.rate_limiter().get(Resource::Search).map(|l| l.remaining), Some(5000));
}

#[tokio::test]
async fn test_code_search_for_renamed_repository() {
    let mut server = Server::new_async().await;
    let _search = server
        .mock("GET", "/search/code")
        .match_query(Matcher::Any)
        .with_status(422)
        .with_body(r#"{"message": "Validation Failed"}"#)
        .create_async()
        .await;

    let mut github = client(&server);
    let result = github.search_code("filename:build.gradle repo:old/name").await;
    assert!(matches!(result, Err(Error::Api { status: 422, .. })));
}

#[tokio::test]
async fn test_code_search_follows_pages() {
    let mut server = Server::new_async().await;
    let next_url = format!("{}/search/code?q=x&per_page=100&page=2", server.url());
    let item = |path: &str| {
        serde_json::json!({
            "name": "build.gradle",
            "path": path,
            "sha": "abc",
            "repository": {"id": 1, "full_name": "foo/bar"}
        })
    };
    let _first = server
        .mock("GET", "/search/code")
        .match_query(Matcher::Exact("q=x&per_page=100".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("link", &format!(r#"<{next_url}>; rel="next""#))
        .with_body(serde_json::json!({"total_count": 2, "items": [item("build.gradle")]}).to_string())
        .create_async()
        .await;
    let _second = server
        .mock("GET", "/search/code")
        .match_query(Matcher::Exact("q=x&per_page=100&page=2".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::json!({"total_count": 2, "items": [item("app/build.gradle")]}).to_string())
        .create_async()
        .await;

    let mut github = client(&server);
    let items = github.search_code("x").await.unwrap();
    let paths: Vec<_> = items.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(paths, vec!["build.gradle", "app/build.gradle"]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_quota_waits_for_reset() {
    let mut github = GitHubClient::new(GitHubConfig::with_api_url("http://127.0.0.1:9")).unwrap();
    let reset = chrono::Utc::now().timestamp() + 5;
    github.rate_limiter_mut().set(
        Resource::Core,
        RateLimit {
            limit: 5000,
            remaining: 0,
            reset,
        },
    );

    let start = tokio::time::Instant::now();
    github.wait_if_needed(Resource::Core).await;
    assert!(start.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_remaining_quota_does_not_wait() {
    let mut github = GitHubClient::new(GitHubConfig::with_api_url("http://127.0.0.1:9")).unwrap();
    github.rate_limiter_mut().set(
        Resource::Core,
        RateLimit {
            limit: 5000,
            remaining: 1,
            reset: chrono::Utc::now().timestamp() + 3600,
        },
    );

    let start = tokio::time::Instant::now();
    github.wait_if_needed(Resource::Core).await;
    assert_eq!(start.elapsed(), Duration::ZERO);
}

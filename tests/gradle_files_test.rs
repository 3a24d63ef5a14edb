use repo_mining::cli::commands::add_gradle_info::update_csv_table;
use repo_mining::cli::commands::get_gradle_files::get_gradle_files;
use repo_mining::github::models::RateLimit;
use repo_mining::github::{GitHubClient, GitHubConfig, Resource};
use std::fs;

#[test]
fn test_table_from_download_directory() {
    let outdir = tempfile::tempdir().unwrap();
    fs::create_dir_all(outdir.path().join("foo/bar/sub")).unwrap();
    fs::write(outdir.path().join("foo/bar/sub/build.gradle"), "apply plugin: 'java'").unwrap();
    fs::create_dir_all(outdir.path().join("foo/nogradle")).unwrap();
    fs::write(outdir.path().join("foo/nogradle/pom.xml"), "<project/>").unwrap();

    let input = "id,full_name\n1,foo/bar\n2,foo/nogradle\n3,foo/missing\n";
    let mut output = Vec::new();
    let rows = update_csv_table(input.as_bytes(), outdir.path(), &mut output).unwrap();

    assert_eq!(rows, 3);
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "id,full_name,has_gradle_files,renamed_to,not_found\n\
         1,foo/bar,True,,\n\
         2,foo/nogradle,False,,\n\
         3,foo/missing,False,,\n"
    );
}

#[tokio::test]
async fn test_download_then_rebuild_table() {
    let mut server = mockito::Server::new_async().await;
    let _search = server
        .mock("GET", "/search/code")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "total_count": 1,
                "items": [{
                    "name": "build.gradle",
                    "path": "app/build.gradle",
                    "sha": "abc",
                    "repository": {"id": 1, "full_name": "foo/bar"}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _contents = server
        .mock("GET", "/repos/foo/bar/contents/app/build.gradle")
        .with_status(200)
        .with_body("apply plugin: 'com.android.application'")
        .create_async()
        .await;

    let mut github = GitHubClient::new(GitHubConfig::with_api_url(server.url())).unwrap();
    let reset = chrono::Utc::now().timestamp() + 3600;
    for resource in [Resource::Core, Resource::Search] {
        github.rate_limiter_mut().set(
            resource,
            RateLimit {
                limit: 30,
                remaining: 30,
                reset,
            },
        );
    }

    let outdir = tempfile::tempdir().unwrap();
    let mut downloaded = Vec::new();
    get_gradle_files(
        "full_name\nfoo/bar\n".as_bytes(),
        &mut github,
        outdir.path(),
        &mut downloaded,
    )
    .await
    .unwrap();

    assert_eq!(
        fs::read_to_string(outdir.path().join("foo/bar/app/build.gradle")).unwrap(),
        "apply plugin: 'com.android.application'"
    );
    assert_eq!(
        String::from_utf8(downloaded).unwrap(),
        "full_name,has_gradle_files,renamed_to,not_found\nfoo/bar,True,,False\n"
    );

    let mut rebuilt = Vec::new();
    update_csv_table("full_name\nfoo/bar\n".as_bytes(), outdir.path(), &mut rebuilt).unwrap();
    assert_eq!(
        String::from_utf8(rebuilt).unwrap(),
        "full_name,has_gradle_files,renamed_to,not_found\nfoo/bar,True,,\n"
    );
}

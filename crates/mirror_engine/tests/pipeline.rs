use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use mirror_core::{JobStatus, KindCounts, ResourceKind};
use mirror_engine::{
    ArchiveNamer, EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput,
    FetchSettings, Fetcher, MirrorFailure, MirrorPipeline, ProgressSink, ReqwestFetcher,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"<html><head><link rel="stylesheet" href="style.css"></head><body><script src="app.js"></script></body></html>"#;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(mirror_logging::initialize_for_tests);
}

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn statuses(&self) -> Vec<JobStatus> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::StatusChanged { status, .. } => Some(*status),
                _ => None,
            })
            .collect()
    }

    fn settled(&self) -> Vec<(ResourceKind, bool)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::ResourceSettled { kind, error, .. } => Some((*kind, error.is_none())),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn pipeline_with(fetcher: Arc<dyn Fetcher>) -> MirrorPipeline {
    MirrorPipeline::new(fetcher, ArchiveNamer::new(Arc::new(|| 1_700_000_000_000)))
}

fn http_pipeline() -> MirrorPipeline {
    pipeline_with(Arc::new(
        ReqwestFetcher::new(FetchSettings::default()).expect("client"),
    ))
}

fn entries(bytes: &[u8]) -> HashMap<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    let mut out = HashMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        out.insert(file.name().to_string(), content);
    }
    out
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn entry_bytes(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    let mut file = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    content
}

fn page_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/", server.uri())).unwrap()
}

#[tokio::test]
async fn mirrors_page_with_stylesheet_and_script() {
    init_logging();
    let server = MockServer::start().await;
    mount(&server, "/", ResponseTemplate::new(200).set_body_raw(PAGE, "text/html")).await;
    mount(
        &server,
        "/style.css",
        ResponseTemplate::new(200).set_body_string("body{color:red}"),
    )
    .await;
    mount(&server, "/app.js", ResponseTemplate::new(200).set_body_string("console.log(1)")).await;

    let sink = TestSink::default();
    let artifact = http_pipeline()
        .run(1, page_url(&server), &sink, &CancellationToken::new())
        .await
        .expect("job succeeds");

    assert_eq!(artifact.file_name, "site-1700000000000.zip");
    let files = entries(&artifact.bytes);
    assert_eq!(files.len(), 3);
    assert_eq!(files["index.html"], PAGE);
    assert_eq!(files["styles.css"], "body{color:red}\n");
    assert_eq!(files["script.js"], "console.log(1)\n");
    assert_eq!(artifact.summary.stylesheets, KindCounts { fetched: 1, failed: 0 });
    assert_eq!(artifact.summary.scripts, KindCounts { fetched: 1, failed: 0 });

    assert_eq!(
        sink.statuses(),
        vec![
            JobStatus::FetchingDocument,
            JobStatus::DiscoveringResources,
            JobStatus::FetchingResources,
            JobStatus::Building,
            JobStatus::Succeeded,
        ]
    );
}

#[tokio::test]
async fn failed_stylesheet_leaves_empty_styles_and_job_succeeds() {
    init_logging();
    let server = MockServer::start().await;
    mount(&server, "/", ResponseTemplate::new(200).set_body_raw(PAGE, "text/html")).await;
    mount(&server, "/style.css", ResponseTemplate::new(500)).await;
    mount(&server, "/app.js", ResponseTemplate::new(200).set_body_string("console.log(1)")).await;

    let sink = TestSink::default();
    let artifact = http_pipeline()
        .run(2, page_url(&server), &sink, &CancellationToken::new())
        .await
        .expect("resource failure is not fatal");

    let files = entries(&artifact.bytes);
    assert_eq!(files["styles.css"], "");
    assert_eq!(files["script.js"], "console.log(1)\n");
    assert_eq!(artifact.summary.stylesheets, KindCounts { fetched: 0, failed: 1 });

    let mut settled = sink.settled();
    settled.sort_by_key(|(kind, _)| *kind == ResourceKind::Script);
    assert_eq!(
        settled,
        vec![(ResourceKind::Stylesheet, false), (ResourceKind::Script, true)]
    );
}

#[tokio::test]
async fn stray_byte_in_stylesheet_is_replaced_not_dropped() {
    init_logging();
    let server = MockServer::start().await;
    let page = r#"<link rel="stylesheet" href="s.css">"#;
    mount(&server, "/", ResponseTemplate::new(200).set_body_raw(page, "text/html")).await;
    mount(
        &server,
        "/s.css",
        ResponseTemplate::new(200)
            .set_body_raw(b"body{color:red}/*\xff*/".to_vec(), "text/css; charset=utf-8"),
    )
    .await;

    let sink = TestSink::default();
    let artifact = http_pipeline()
        .run(11, page_url(&server), &sink, &CancellationToken::new())
        .await
        .expect("job succeeds");

    let files = entries(&artifact.bytes);
    assert_eq!(files["styles.css"], "body{color:red}/*\u{FFFD}*/\n");
    assert_eq!(artifact.summary.stylesheets, KindCounts { fetched: 1, failed: 0 });
    assert_eq!(sink.settled(), vec![(ResourceKind::Stylesheet, true)]);
}

#[tokio::test]
async fn stray_byte_in_document_keeps_discovery() {
    init_logging();
    let server = MockServer::start().await;
    let page = b"<p>caf\xff</p><script src=\"app.js\"></script>".to_vec();
    mount(
        &server,
        "/",
        ResponseTemplate::new(200).set_body_raw(page.clone(), "text/html; charset=utf-8"),
    )
    .await;
    mount(&server, "/app.js", ResponseTemplate::new(200).set_body_string("run()")).await;

    let artifact = http_pipeline()
        .run(12, page_url(&server), &TestSink::default(), &CancellationToken::new())
        .await
        .expect("job succeeds");

    assert_eq!(artifact.summary.scripts, KindCounts { fetched: 1, failed: 0 });
    assert_eq!(entry_bytes(&artifact.bytes, "script.js"), b"run()\n".to_vec());
    // The document is archived byte for byte, invalid sequence included.
    assert_eq!(entry_bytes(&artifact.bytes, "index.html"), page);
}

#[tokio::test]
async fn one_failure_does_not_hide_sibling_bodies() {
    init_logging();
    let server = MockServer::start().await;
    let page = r#"<link rel="stylesheet" href="/a.css"><link rel="stylesheet" href="/missing.css"><link rel="stylesheet" href="/b.css">"#;
    mount(&server, "/", ResponseTemplate::new(200).set_body_raw(page, "text/html")).await;
    // The first stylesheet finishes last; aggregation still follows discovery order.
    mount(
        &server,
        "/a.css",
        ResponseTemplate::new(200)
            .set_delay(Duration::from_millis(100))
            .set_body_string("a{}"),
    )
    .await;
    mount(&server, "/missing.css", ResponseTemplate::new(404)).await;
    mount(&server, "/b.css", ResponseTemplate::new(200).set_body_string("b{}")).await;

    let artifact = http_pipeline()
        .run(3, page_url(&server), &TestSink::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(entries(&artifact.bytes)["styles.css"], "a{}\nb{}\n");
    assert_eq!(artifact.summary.stylesheets, KindCounts { fetched: 2, failed: 1 });
}

#[tokio::test]
async fn document_failure_is_fatal() {
    init_logging();
    let server = MockServer::start().await;
    mount(&server, "/", ResponseTemplate::new(404).set_body_raw(PAGE, "text/html")).await;

    let sink = TestSink::default();
    let err = http_pipeline()
        .run(4, page_url(&server), &sink, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        MirrorFailure::DocumentFetch(fetch) => assert_eq!(fetch.kind, FailureKind::HttpStatus(404)),
        other => panic!("unexpected failure {other:?}"),
    }
    assert_eq!(
        sink.statuses(),
        vec![JobStatus::FetchingDocument, JobStatus::FailedTotal]
    );
    assert!(sink.settled().is_empty());
}

#[tokio::test]
async fn page_without_resources_still_builds_archive() {
    init_logging();
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        ResponseTemplate::new(200).set_body_raw("<p>plain</p>", "text/html"),
    )
    .await;

    let artifact = http_pipeline()
        .run(5, page_url(&server), &TestSink::default(), &CancellationToken::new())
        .await
        .unwrap();

    let files = entries(&artifact.bytes);
    assert_eq!(files["index.html"], "<p>plain</p>");
    assert_eq!(files["styles.css"], "");
    assert_eq!(files["script.js"], "");
}

#[tokio::test]
async fn resources_resolve_against_redirect_target() {
    init_logging();
    let server = MockServer::start().await;
    mount(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("Location", "/new/page"),
    )
    .await;
    mount(
        &server,
        "/new/page",
        ResponseTemplate::new(200).set_body_raw(r#"<script src="app.js"></script>"#, "text/html"),
    )
    .await;
    mount(&server, "/new/app.js", ResponseTemplate::new(200).set_body_string("moved()")).await;

    let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
    let artifact = http_pipeline()
        .run(6, url, &TestSink::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(entries(&artifact.bytes)["script.js"], "moved()\n");
}

/// Serves the page instantly and never answers resource requests.
struct HangingResources;

#[async_trait::async_trait]
impl Fetcher for HangingResources {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        if url.ends_with('/') {
            return Ok(FetchOutput {
                bytes: PAGE.as_bytes().to_vec().into(),
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    content_type: Some("text/html".to_string()),
                    byte_len: PAGE.len() as u64,
                },
            });
        }
        std::future::pending().await
    }
}

#[tokio::test]
async fn cancellation_aborts_resource_fetches_and_skips_build() {
    init_logging();
    let pipeline = pipeline_with(Arc::new(HangingResources));
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let sink = TestSink::default();
    let err = pipeline
        .run(7, Url::parse("https://example.test/").unwrap(), &sink, &token)
        .await
        .unwrap_err();

    assert_eq!(err, MirrorFailure::Cancelled);
    let statuses = sink.statuses();
    assert_eq!(statuses.last(), Some(&JobStatus::Cancelled));
    assert!(!statuses.contains(&JobStatus::Building));
    assert!(sink.settled().is_empty());
}

#[tokio::test]
async fn cancelled_before_start_never_fetches() {
    init_logging();
    let token = CancellationToken::new();
    token.cancel();

    let sink = TestSink::default();
    let err = pipeline_with(Arc::new(HangingResources))
        .run(8, Url::parse("https://example.test/").unwrap(), &sink, &token)
        .await
        .unwrap_err();

    assert_eq!(err, MirrorFailure::Cancelled);
    assert_eq!(
        sink.statuses(),
        vec![JobStatus::FetchingDocument, JobStatus::Cancelled]
    );
}

use std::sync::Once;

use mirror_core::{update, AppState, Effect, Msg, Notification, SearchResult};
use pretty_assertions::assert_eq;
use url::Url;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(mirror_logging::initialize_for_tests);
}

fn hit(link: &str) -> SearchResult {
    SearchResult {
        title: "T".into(),
        link: link.into(),
        snippet: "S".into(),
        display_link: "example.com".into(),
    }
}

#[test]
fn mirror_request_starts_job_with_normalized_url() {
    init_logging();
    let state = AppState::new();
    let (mut next, effects) = update(
        state,
        Msg::MirrorRequested {
            url: "  example.com/page ".into(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::StartMirror {
            job_id: 1,
            url: Url::parse("https://example.com/page").unwrap(),
        }]
    );
    let view = next.view();
    assert_eq!(view.jobs.len(), 1);
    assert_eq!(view.active_jobs, 1);
    assert!(!view.all_settled());
    assert!(next.consume_dirty());
    assert!(!next.consume_dirty());
}

#[test]
fn invalid_input_is_rejected_without_a_job() {
    init_logging();
    let (next, effects) = update(
        AppState::new(),
        Msg::MirrorRequested {
            url: "mailto:someone@example.com".into(),
        },
    );

    assert!(next.view().jobs.is_empty());
    assert!(matches!(
        effects.as_slice(),
        [Effect::Notify(Notification::Rejected { .. })]
    ));
}

#[test]
fn relative_input_resolves_against_previous_page() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::MirrorRequested {
            url: "https://example.com/blog/index.html".into(),
        },
    );
    let (_, effects) = update(
        state,
        Msg::MirrorRequested {
            url: "./archive.html".into(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartMirror {
            job_id: 2,
            url: Url::parse("https://example.com/blog/archive.html").unwrap(),
        }]
    );
}

#[test]
fn bare_host_after_previous_page_gets_https() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::MirrorRequested {
            url: "https://a.test/page".into(),
        },
    );
    let (_, effects) = update(
        state,
        Msg::MirrorRequested {
            url: "example.com".into(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartMirror {
            job_id: 2,
            url: Url::parse("https://example.com/").unwrap(),
        }]
    );
}

#[test]
fn search_result_link_never_uses_previous_page() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::MirrorRequested {
            url: "https://a.test/blog/".into(),
        },
    );
    let (state, _) = update(state, Msg::SearchResultsReceived(vec![hit("docs")]));
    let (_, effects) = update(state, Msg::MirrorResultRequested { index: 0 });
    assert_eq!(
        effects,
        vec![Effect::StartMirror {
            job_id: 2,
            url: Url::parse("https://docs/").unwrap(),
        }]
    );
}

#[test]
fn search_results_feed_mirror_requests_by_index() {
    init_logging();
    let results = vec![hit("https://a.example.com/"), hit("https://b.example.com/x")];
    let (state, effects) = update(AppState::new(), Msg::SearchResultsReceived(results.clone()));
    assert!(effects.is_empty());
    assert_eq!(state.view().search_results, results);

    let (state, effects) = update(state, Msg::MirrorResultRequested { index: 1 });
    assert_eq!(
        effects,
        vec![Effect::StartMirror {
            job_id: 1,
            url: Url::parse("https://b.example.com/x").unwrap(),
        }]
    );

    let (_, effects) = update(state, Msg::MirrorResultRequested { index: 9 });
    assert!(matches!(
        effects.as_slice(),
        [Effect::Notify(Notification::Rejected { .. })]
    ));
}

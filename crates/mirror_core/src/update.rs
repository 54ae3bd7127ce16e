use url::Url;

use crate::{parse_source_url, AppState, Effect, JobId, JobResultKind, Msg, Notification};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SearchResultsReceived(results) => {
            state.set_search_results(results);
            Vec::new()
        }
        Msg::MirrorRequested { url } => {
            let referrer = state.last_source().cloned();
            request_mirror(&mut state, &url, referrer.as_ref())
        }
        Msg::MirrorResultRequested { index } => {
            let link = state.search_result(index).map(|result| result.link.clone());
            match link {
                Some(link) => request_mirror(&mut state, &link, None),
                None => vec![Effect::Notify(Notification::Rejected {
                    input: format!("#{index}"),
                    reason: "no such search result".to_string(),
                })],
            }
        }
        Msg::CancelRequested { job_id } => {
            if state.is_active(job_id) {
                vec![Effect::CancelMirror { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::JobStatusChanged { job_id, status } => {
            state.apply_status(job_id, status);
            Vec::new()
        }
        Msg::ResourceSettled {
            job_id,
            kind,
            fetched,
        } => {
            state.apply_resource(job_id, kind, fetched);
            Vec::new()
        }
        Msg::JobDone { job_id, result } => {
            let notification = notification_for(job_id, &result);
            if state.apply_done(job_id, result) {
                vec![Effect::Notify(notification)]
            } else {
                Vec::new()
            }
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Search result links are never resolved against an earlier page, so only
/// typed input passes a `referrer`.
fn request_mirror(state: &mut AppState, raw: &str, referrer: Option<&Url>) -> Vec<Effect> {
    match parse_source_url(raw, referrer) {
        Ok(url) => {
            let job_id = state.start_job(url.clone());
            vec![Effect::StartMirror { job_id, url }]
        }
        Err(err) => vec![Effect::Notify(Notification::Rejected {
            input: raw.trim().to_string(),
            reason: err.to_string(),
        })],
    }
}

fn notification_for(job_id: JobId, result: &JobResultKind) -> Notification {
    match result {
        JobResultKind::Succeeded { file_name, summary } => Notification::Succeeded {
            job_id,
            file_name: file_name.clone(),
            summary: *summary,
        },
        JobResultKind::DocumentFetchFailed { reason } => Notification::Failed {
            job_id,
            reason: format!("could not fetch page: {reason}"),
        },
        JobResultKind::BuildFailed { reason } => Notification::Failed {
            job_id,
            reason: format!("could not package page: {reason}"),
        },
        JobResultKind::Cancelled => Notification::Failed {
            job_id,
            reason: "cancelled".to_string(),
        },
    }
}

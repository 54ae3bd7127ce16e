use std::time::Duration;

use anyhow::{bail, Context};
use mirror_core::{update, AppState, AppViewModel, Effect, Msg, Notification};
use mirror_engine::{ArchiveWriter, EngineHandle};
use mirror_logging::{mirror_debug, mirror_info};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::results::load_results;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Runs every requested job to completion. Returns whether all succeeded.
pub fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<bool> {
    let mut inbox = Vec::new();
    if let Some(path) = &cli.results {
        let results = load_results(path)?;
        if cli.picks.is_empty() && cli.urls.is_empty() {
            print_results(&results);
            return Ok(true);
        }
        inbox.push(Msg::SearchResultsReceived(results));
        inbox.extend(
            cli.picks
                .iter()
                .map(|&index| Msg::MirrorResultRequested { index }),
        );
    } else if !cli.picks.is_empty() {
        bail!("--pick needs --results");
    }
    inbox.extend(
        cli.urls
            .iter()
            .map(|url| Msg::MirrorRequested { url: url.clone() }),
    );
    if inbox.is_empty() {
        bail!("nothing to mirror: pass a URL or --results");
    }

    let output_dir = cli.out.clone().unwrap_or_else(|| config.output_dir.clone());
    let engine = EngineHandle::new(config.engine_config())?;
    let runner = EffectRunner::new(engine, ArchiveWriter::new(output_dir));
    mirror_info!("Writing archives to {:?}", runner.output_dir());

    let mut session = Session {
        state: AppState::new(),
        failures: 0,
    };
    for msg in inbox {
        session.dispatch(msg, &runner);
    }

    while !session.state.view().all_settled() {
        let polled = runner
            .poll(POLL_INTERVAL)
            .context("engine stopped before all jobs settled")?;
        if let Some(msg) = polled {
            session.dispatch(msg, &runner);
        }
        if session.state.consume_dirty() {
            render(&session.state.view());
        }
    }

    Ok(session.failures == 0)
}

struct Session {
    state: AppState,
    failures: usize,
}

impl Session {
    fn dispatch(&mut self, msg: Msg, runner: &EffectRunner) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.failures += effects
            .iter()
            .filter(|effect| {
                matches!(
                    effect,
                    Effect::Notify(Notification::Failed { .. } | Notification::Rejected { .. })
                )
            })
            .count();
        runner.apply(effects);
    }
}

fn render(view: &AppViewModel) {
    for job in &view.jobs {
        mirror_debug!(
            "[{}] {} {} (css {}/{} ok, js {}/{} ok)",
            job.job_id,
            job.status,
            job.url,
            job.summary.stylesheets.fetched,
            job.summary.stylesheets.fetched + job.summary.stylesheets.failed,
            job.summary.scripts.fetched,
            job.summary.scripts.fetched + job.summary.scripts.failed,
        );
    }
}

fn print_results(results: &[mirror_core::SearchResult]) {
    for (index, result) in results.iter().enumerate() {
        println!("{index:>3}  {}  {}", result.title, result.link);
        if !result.display_link.is_empty() {
            println!("     {}", result.display_link);
        }
    }
}

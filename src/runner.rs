//! Drives a list session from a script of UI events.
//!
//! Each non-blank script line is a `UiCommand` in JSON. Fetches go to a worker task that answers
//! them from the fixture after a per-request delay, so completions can come back in a different
//! order than they were dispatched. The store keeps only the latest request per list.

use crate::fixture::Fixture;
use pview_core::dispatch::Action;
use pview_core::store::{FetchCompletion, Resolution};
use pview_core::{CoreConfig, ListView, Outcome, Session, UiCommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

#[derive(Clone, Debug)]
pub struct RunnerOptions {
    /// Upper bound of the delay before a fetch completes.
    pub max_jitter: Duration,
    /// Wait for every fetch of a command to complete before reading the next command.
    pub settle: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            max_jitter: Duration::from_millis(25),
            settle: true,
        }
    }
}

/// Counts of what happened during a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub commands: usize,
    pub fetches: usize,
    pub applied: usize,
    pub superseded: usize,
}

pub struct Runner {
    session: Session,
    fixture: Arc<Fixture>,
    options: RunnerOptions,
    stats: RunStats,
}

impl Runner {
    pub fn new(cfg: Arc<CoreConfig>, fixture: Fixture, options: RunnerOptions) -> Self {
        Self {
            session: Session::new(cfg),
            fixture: Arc::new(fixture),
            options,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Runs every command of `script` and waits for all outstanding fetches.
    ///
    /// Every spawned fetch reports back exactly once, with `None` when it produced nothing.
    pub async fn run<R>(&mut self, script: R) -> anyhow::Result<ListView>
    where
        R: AsyncBufRead + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Option<FetchCompletion>>();
        let mut in_flight = 0usize;
        let mut lines = script.lines();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let event: UiCommand = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(line = line_no, error = %err, "skipping unreadable command");
                    continue;
                }
            };

            // Apply whatever has already come back before deciding on the next event.
            while let Ok(completion) = rx.try_recv() {
                in_flight -= 1;
                self.resolve(completion);
            }

            let handled = self.session.handle(&event);
            self.stats.commands += 1;
            log_outcome(line_no, &event, &handled.outcome);

            for action in handled.fetches {
                self.stats.fetches += 1;
                in_flight += 1;
                self.spawn_fetch(action, tx.clone());
            }

            if self.options.settle {
                while in_flight > 0 {
                    let Some(completion) = rx.recv().await else {
                        break;
                    };
                    in_flight -= 1;
                    self.resolve(completion);
                }
            }
        }

        drop(tx);
        while in_flight > 0 {
            let Some(completion) = rx.recv().await else {
                break;
            };
            in_flight -= 1;
            self.resolve(completion);
        }

        tracing::info!(
            commands = self.stats.commands,
            fetches = self.stats.fetches,
            applied = self.stats.applied,
            superseded = self.stats.superseded,
            "script finished"
        );
        Ok(self.session.view())
    }

    fn resolve(&mut self, completion: Option<FetchCompletion>) {
        let Some(completion) = completion else {
            return;
        };
        match self.session.complete(completion) {
            Resolution::Applied => self.stats.applied += 1,
            Resolution::Superseded | Resolution::Unknown => self.stats.superseded += 1,
        }
    }

    fn spawn_fetch(&self, action: Action, tx: mpsc::UnboundedSender<Option<FetchCompletion>>) {
        let Action::FetchData { request_id, .. } = &action else {
            return;
        };
        let request_id = request_id.clone();
        let delay = jitter(&request_id, self.options.max_jitter);
        let fixture = Arc::clone(&self.fixture);

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let completion = match fixture.payload(&action) {
                Ok(payload) => payload.map(|payload| FetchCompletion {
                    request_id,
                    payload,
                }),
                Err(err) => {
                    // The list keeps its prior rows.
                    tracing::error!(%request_id, error = %err, "fetch failed");
                    None
                }
            };
            if tx.send(completion).is_err() {
                tracing::debug!("runner stopped before fetch completed");
            }
        });
    }
}

/// A delay in `0..=max` derived from the request's UUID.
fn jitter(request_id: &pview_uuid::RequestId, max: Duration) -> Duration {
    let max_ms = max.as_millis();
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let ms = request_id.uuid().as_u128() % (max_ms + 1);
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

fn log_outcome(line: usize, event: &UiCommand, outcome: &Outcome) {
    match outcome {
        Outcome::Dispatched { request_ids } => {
            tracing::info!(line, kind = ?event.kind, fetches = request_ids.len(), "dispatched")
        }
        Outcome::Updated => tracing::info!(line, kind = ?event.kind, "updated"),
        Outcome::Rejected(boundary) => {
            tracing::info!(line, kind = ?event.kind, ?boundary, "declined at boundary")
        }
        Outcome::Ignored => tracing::debug!(line, kind = ?event.kind, "ignored"),
        Outcome::Failed(err) => tracing::warn!(line, kind = ?event.kind, error = %err, "failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(settle: bool) -> Runner {
        Runner::new(
            Arc::new(CoreConfig::default()),
            Fixture::generated(950),
            RunnerOptions {
                max_jitter: Duration::from_millis(5),
                settle,
            },
        )
    }

    const SCRIPT: &str = r#"
# mount, then move to the second window and sort by birth date
{"kind": "mount"}
{"kind": "paginate", "value": "next"}
{"kind": "headerClick", "columnId": "birthDatetime"}
"#;

    #[tokio::test]
    async fn settled_run_applies_every_fetch() {
        let mut runner = runner(true);
        let view = runner.run(SCRIPT.as_bytes()).await.expect("run");

        assert_eq!(view.current_page.get(), 11);
        assert_eq!(view.total_length, Some(950));
        assert_eq!(view.rows.len(), 10);
        assert_eq!(view.page_numbers, (11..=20).collect::<Vec<_>>());
        assert_eq!(view.sort.map(|s| s.column), Some("birth".to_string()));

        let stats = runner.stats();
        assert_eq!(stats.commands, 3);
        assert_eq!(stats.fetches, 6);
        assert_eq!(stats.applied, 6);
    }

    #[tokio::test]
    async fn unsettled_run_keeps_only_latest_rows() {
        let mut runner = runner(false);
        let script = r#"
{"kind": "mount"}
{"kind": "changeLength", "value": "20"}
{"kind": "changeLength", "value": "50"}
"#;
        let view = runner.run(script.as_bytes()).await.expect("run");

        assert_eq!(view.rows.len(), 50);
        let stats = runner.stats();
        assert_eq!(stats.fetches, 6);
        assert_eq!(stats.applied + stats.superseded, 6);
    }

    #[tokio::test]
    async fn unreadable_lines_are_skipped() {
        let mut runner = runner(true);
        let script = "{\"kind\": \"mount\"}\nnot json\n{\"kind\": \"teleport\"}\n";
        runner.run(script.as_bytes()).await.expect("run");
        assert_eq!(runner.stats().commands, 1);
    }

    #[test]
    fn jitter_stays_within_bound() {
        let mut ids = pview_uuid::RequestIdGenerator::new();
        for _ in 0..50 {
            let delay = jitter(&ids.next_id(), Duration::from_millis(7));
            assert!(delay <= Duration::from_millis(7));
        }
        assert_eq!(
            jitter(&ids.next_id(), Duration::ZERO),
            Duration::ZERO
        );
    }
}

// ABOUTME: Issues create/delete/modify commands for every non-trivial diff item.
// ABOUTME: Runs one bounded task per item and collects failures without aborting.

use super::client::RectificationClient;
use super::error::{Action, RectificationError, UnitFailure};
use crate::deploy::{Deployment, DeploymentPair, DiffResult};
use crate::types::DeployId;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Commands in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Time allowed for one scheduler call unless configured otherwise.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// One independently schedulable unit of rectification.
enum Command {
    Create(Arc<Deployment>),
    Delete(Arc<Deployment>),
    Modify(DeploymentPair),
}

impl Command {
    fn id(&self) -> DeployId {
        match self {
            Command::Create(d) | Command::Delete(d) => d.id(),
            Command::Modify(pair) => pair.id.clone(),
        }
    }

    fn action(&self) -> Action {
        match self {
            Command::Create(_) => Action::Create,
            Command::Delete(_) => Action::Delete,
            Command::Modify(_) => Action::Modify,
        }
    }

    async fn dispatch<C: RectificationClient + ?Sized>(
        &self,
        client: &C,
    ) -> Result<(), super::ClientError> {
        match self {
            Command::Create(d) => client.create(d).await,
            Command::Delete(d) => client.delete(d).await,
            Command::Modify(pair) => client.modify(&pair.prior, &pair.post).await,
        }
    }
}

/// Outcome of one rectification run.
#[derive(Debug, Default)]
pub struct RectifyReport {
    pub created: usize,
    pub deleted: usize,
    pub modified: usize,
    pub unchanged: usize,
    /// Failed units, sorted by deployment id.
    pub errors: Vec<RectificationError>,
}

impl RectifyReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of commands issued, successful or not.
    pub fn attempted(&self) -> usize {
        self.created + self.deleted + self.modified + self.errors.len()
    }

    fn record(&mut self, id: DeployId, action: Action, outcome: Result<(), UnitFailure>) {
        match outcome {
            Ok(()) => match action {
                Action::Create => self.created += 1,
                Action::Delete => self.deleted += 1,
                Action::Modify => self.modified += 1,
            },
            Err(cause) => self.errors.push(RectificationError::new(id, action, cause)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rectifier {
    concurrency: usize,
    call_timeout: Duration,
}

impl Default for Rectifier {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, DEFAULT_CALL_TIMEOUT)
    }
}

impl Rectifier {
    pub fn new(concurrency: usize, call_timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            call_timeout,
        }
    }

    /// Create everything new, delete everything gone and modify everything
    /// changed. Same items are left alone.
    ///
    /// A failing unit never cancels its siblings. Returns once every unit has
    /// finished, so the report holds every outcome.
    pub async fn rectify<C>(
        &self,
        diff: &DiffResult,
        client: Arc<C>,
        cancel: &CancellationToken,
    ) -> RectifyReport
    where
        C: RectificationClient + ?Sized + 'static,
    {
        let mut commands: Vec<Command> = Vec::new();
        commands.extend(diff.new.to_vec().into_iter().map(Command::Create));
        commands.extend(diff.gone.to_vec().into_iter().map(Command::Delete));
        commands.extend(diff.changed.iter().cloned().map(Command::Modify));

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for command in commands {
            let client = Arc::clone(&client);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let call_timeout = self.call_timeout;

            join_set.spawn(async move {
                let id = command.id();
                let action = command.action();
                let outcome = AssertUnwindSafe(run_unit(
                    &command,
                    client.as_ref(),
                    &semaphore,
                    &cancel,
                    call_timeout,
                ))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(UnitFailure::Panicked(panic_message(panic))));
                (id, action, outcome)
            });
        }

        let mut report = RectifyReport {
            unchanged: diff.same.len(),
            ..Default::default()
        };

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((id, action, outcome)) => {
                    if let Err(ref e) = outcome {
                        tracing::debug!(deployment = %id, %action, error = %e, "rectification failed");
                    }
                    report.record(id, action, outcome);
                }
                Err(e) => {
                    tracing::error!(error = %e, "rectification task did not complete");
                }
            }
        }

        report.errors.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::info!(
            created = report.created,
            deleted = report.deleted,
            modified = report.modified,
            unchanged = report.unchanged,
            failed = report.errors.len(),
            "rectification finished"
        );

        report
    }
}

async fn run_unit<C: RectificationClient + ?Sized>(
    command: &Command,
    client: &C,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
    call_timeout: Duration,
) -> Result<(), UnitFailure> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(UnitFailure::Cancelled),
        permit = semaphore.acquire() => permit.map_err(|_| UnitFailure::Cancelled)?,
    };

    tracing::debug!(deployment = %command.id(), action = %command.action(), "dispatching");

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(UnitFailure::Cancelled),
        result = tokio::time::timeout(call_timeout, command.dispatch(client)) => match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(UnitFailure::Client(e)),
            Err(_) => Err(UnitFailure::TimedOut(call_timeout)),
        },
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{Annotation, DeployConfig, Deployments};
    use crate::rectify::ClientError;
    use crate::types::{ManifestKind, OwnerSet, SourceId, SourceLocation, parse_version};
    use async_trait::async_trait;

    struct Accepting;

    #[async_trait]
    impl RectificationClient for Accepting {
        async fn image_name(&self, _: &Deployment) -> Result<String, ClientError> {
            Ok("image".to_string())
        }
        async fn create(&self, _: &Deployment) -> Result<(), ClientError> {
            Ok(())
        }
        async fn delete(&self, _: &Deployment) -> Result<(), ClientError> {
            Ok(())
        }
        async fn modify(&self, _: &Deployment, _: &Deployment) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn deployment(repo: &str) -> Deployment {
        Deployment {
            config: DeployConfig::default(),
            cluster_name: "east".to_string(),
            cluster: None,
            source_id: SourceId::new(SourceLocation::repo(repo), parse_version("1.0.0").unwrap()),
            flavor: String::new(),
            owners: OwnerSet::new(),
            kind: ManifestKind::HttpService,
            annotation: Annotation::default(),
        }
    }

    #[tokio::test]
    async fn empty_diff_issues_nothing() {
        let report = Rectifier::default()
            .rectify(&DiffResult::default(), Arc::new(Accepting), &CancellationToken::new())
            .await;
        assert!(report.is_success());
        assert_eq!(report.attempted(), 0);
    }

    #[tokio::test]
    async fn cancelled_run_reports_every_unit() {
        let diff = DiffResult {
            new: Deployments::try_from_iter([deployment("one"), deployment("two")]).unwrap(),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = Rectifier::new(1, DEFAULT_CALL_TIMEOUT)
            .rectify(&diff, Arc::new(Accepting), &cancel)
            .await;

        assert_eq!(report.created, 0);
        assert_eq!(report.errors.len(), 2);
        assert!(
            report
                .errors
                .iter()
                .all(|e| matches!(e.cause, UnitFailure::Cancelled))
        );
    }

    #[test]
    fn zero_concurrency_is_raised_to_one() {
        assert_eq!(Rectifier::new(0, DEFAULT_CALL_TIMEOUT).concurrency, 1);
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "unknown panic");
    }
}

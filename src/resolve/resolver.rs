// ABOUTME: Runs a reconciliation pass: expand, guard, fetch, diff, rectify, report.
// ABOUTME: Only failures before rectification fail the pass.

use super::error::{
    ImageNameFailure, IntendedSnafu, LoadSnafu, MissingImageNamesError, ResolveError,
    RunningSnafu,
};
use crate::deploy::{Deployments, State};
use crate::rectify::{
    ClusterStateSource, DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY, RectificationClient,
    RectifyReport, Rectifier, UnitFailure,
};
use futures::StreamExt;
use snafu::ResultExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Scheduler calls in flight at once, for both the guard and rectification.
    pub concurrency: usize,
    /// Time allowed for each scheduler call.
    pub call_timeout: Duration,
    /// Deadline for the whole pass.
    pub pass_timeout: Option<Duration>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            pass_timeout: None,
        }
    }
}

/// Outcome of a pass that reached rectification.
#[derive(Debug, Default)]
pub struct ResolveReport {
    pub intended: usize,
    pub actual: usize,
    pub rectify: RectifyReport,
}

impl ResolveReport {
    /// True when every rectification command succeeded.
    pub fn is_converged(&self) -> bool {
        self.rectify.is_success()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Load state from `dir`, then [`Resolver::resolve`] it.
    pub async fn resolve_dir<C, S>(
        &self,
        client: Arc<C>,
        dir: &Path,
        source: &S,
        cancel: &CancellationToken,
    ) -> Result<ResolveReport, ResolveError>
    where
        C: RectificationClient + ?Sized + 'static,
        S: ClusterStateSource + ?Sized,
    {
        let state = crate::config::load_state(dir).context(LoadSnafu)?;
        self.resolve(client, &state, source, cancel).await
    }

    /// Run one reconciliation pass.
    ///
    /// Fails only if the intended state is invalid, an intended image is
    /// unknown, the live state cannot be fetched, or the pass is cancelled
    /// before rectification. Rectification failures are logged and returned
    /// in the report; the next pass retries whatever still diverges.
    pub async fn resolve<C, S>(
        &self,
        client: Arc<C>,
        state: &State,
        source: &S,
        cancel: &CancellationToken,
    ) -> Result<ResolveReport, ResolveError>
    where
        C: RectificationClient + ?Sized + 'static,
        S: ClusterStateSource + ?Sized,
    {
        let pass = cancel.child_token();
        let deadline = self.options.pass_timeout.map(|timeout| {
            let pass = pass.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!(?timeout, "reconciliation pass ran past its deadline");
                pass.cancel();
            })
        });

        let result = self.run_pass(client, state, source, &pass).await;

        if let Some(deadline) = deadline {
            deadline.abort();
        }
        result
    }

    async fn run_pass<C, S>(
        &self,
        client: Arc<C>,
        state: &State,
        source: &S,
        cancel: &CancellationToken,
    ) -> Result<ResolveReport, ResolveError>
    where
        C: RectificationClient + ?Sized + 'static,
        S: ClusterStateSource + ?Sized,
    {
        let intended = state.deployments().context(IntendedSnafu)?;
        tracing::debug!(intended = intended.len(), "expanded intended deployments");

        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let guarded = self
            .guard_image_names(client.as_ref(), &intended, cancel)
            .await;
        // Lookups cut short by cancellation are not missing images.
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        guarded?;

        let base_urls = state.base_urls();
        let actual = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
            fetched = tokio::time::timeout(
                self.options.call_timeout,
                source.running_deployment_set(&base_urls),
            ) => match fetched {
                Ok(result) => result.context(RunningSnafu)?,
                Err(_) => return Err(ResolveError::RunningTimeout),
            },
        };
        tracing::debug!(actual = actual.len(), "fetched running deployments");

        let diff = actual.diff(&intended);
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let rectifier = Rectifier::new(self.options.concurrency, self.options.call_timeout);
        let rectify = rectifier.rectify(&diff, client, cancel).await;

        for e in &rectify.errors {
            tracing::warn!(
                deployment = %e.id,
                action = %e.action,
                error = %e.cause,
                "rectification failed"
            );
        }

        Ok(ResolveReport {
            intended: intended.len(),
            actual: actual.len(),
            rectify,
        })
    }

    /// Check every intended deployment has a known image. Collects all
    /// failures instead of stopping at the first.
    async fn guard_image_names<C>(
        &self,
        client: &C,
        intended: &Deployments,
        cancel: &CancellationToken,
    ) -> Result<(), MissingImageNamesError>
    where
        C: RectificationClient + ?Sized,
    {
        let call_timeout = self.options.call_timeout;

        let mut causes: Vec<ImageNameFailure> = futures::stream::iter(intended.to_vec())
            .map(|deployment| async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(UnitFailure::Cancelled),
                    result = tokio::time::timeout(call_timeout, client.image_name(&deployment)) => {
                        match result {
                            Ok(Ok(name)) => {
                                tracing::trace!(deployment = %deployment.id(), image = %name, "image known");
                                Ok(())
                            }
                            Ok(Err(e)) => Err(UnitFailure::Client(e)),
                            Err(_) => Err(UnitFailure::TimedOut(call_timeout)),
                        }
                    }
                };
                outcome.err().map(|cause| ImageNameFailure {
                    id: deployment.id(),
                    source_id: deployment.source_id.clone(),
                    cause,
                })
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .filter_map(|failure| async move { failure })
            .collect()
            .await;

        if causes.is_empty() {
            return Ok(());
        }

        causes.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::warn!(missing = causes.len(), "image names unknown; skipping rectification");
        Err(MissingImageNamesError { causes })
    }
}

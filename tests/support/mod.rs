// ABOUTME: Test support utilities.
// ABOUTME: Deployment builders and fake scheduler backends for integration tests.

use async_trait::async_trait;
use converge::deploy::{Annotation, DeployConfig, Deployment, Deployments};
use converge::rectify::{Action, ClientError, ClusterStateSource, RectificationClient};
use converge::types::{ManifestKind, OwnerSet, SourceId, SourceLocation, parse_version};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("converge=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A deployment of `repo` at 1.1.1-latest in cluster "test".
#[allow(dead_code)]
pub fn make_deployment(repo: &str, num_instances: u32) -> Deployment {
    make_deployment_in(repo, "test", num_instances)
}

#[allow(dead_code)]
pub fn make_deployment_in(repo: &str, cluster: &str, num_instances: u32) -> Deployment {
    let mut owners = OwnerSet::new();
    owners.add("judson");

    Deployment {
        config: DeployConfig {
            num_instances,
            env: HashMap::new(),
            resources: HashMap::from([
                ("cpus".to_string(), "0.1".to_string()),
                ("memory".to_string(), "100".to_string()),
                ("ports".to_string(), "1".to_string()),
            ]),
            volumes: vec![],
        },
        cluster_name: cluster.to_string(),
        cluster: None,
        source_id: SourceId::new(
            SourceLocation::repo(repo),
            parse_version("1.1.1-latest").unwrap(),
        ),
        flavor: String::new(),
        owners,
        kind: ManifestKind::HttpService,
        annotation: Annotation::default(),
    }
}

#[allow(dead_code)]
pub fn deployments(items: Vec<Deployment>) -> Deployments {
    Deployments::try_from_iter(items).unwrap()
}

/// A scheduler backend that records calls and misbehaves on request.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeClient {
    missing_images: HashSet<String>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    hanging: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(Action, String)>>,
    image_lookups: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// No image is known for `repo`.
    pub fn missing_image(mut self, repo: &str) -> Self {
        self.missing_images.insert(repo.to_string());
        self
    }

    /// Every command for `repo` is rejected.
    pub fn failing(mut self, repo: &str) -> Self {
        self.failing.insert(repo.to_string());
        self
    }

    pub fn panicking(mut self, repo: &str) -> Self {
        self.panicking.insert(repo.to_string());
        self
    }

    /// Commands for `repo` never return.
    pub fn hanging(mut self, repo: &str) -> Self {
        self.hanging.insert(repo.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Commands issued so far, sorted by repo.
    pub fn calls(&self) -> Vec<(Action, String)> {
        let mut calls = self.calls.lock().clone();
        calls.sort_by(|a, b| a.1.cmp(&b.1));
        calls
    }

    pub fn image_lookups(&self) -> usize {
        self.image_lookups.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn command(&self, action: Action, deployment: &Deployment) -> Result<(), ClientError> {
        let repo = deployment.source_id.location.repo.clone();
        self.calls.lock().push((action, repo.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hanging.contains(&repo) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&repo) {
            panic!("scheduler exploded on {}", repo);
        }
        if self.failing.contains(&repo) {
            return Err(ClientError::Rejected(format!("{} refused", repo)));
        }
        Ok(())
    }
}

#[async_trait]
impl RectificationClient for FakeClient {
    async fn image_name(&self, deployment: &Deployment) -> Result<String, ClientError> {
        self.image_lookups.fetch_add(1, Ordering::SeqCst);
        let repo = &deployment.source_id.location.repo;
        if self.missing_images.contains(repo) {
            return Err(ClientError::UnknownImage(deployment.source_id.clone()));
        }
        Ok(format!(
            "registry.example.com/{}:{}",
            repo, deployment.source_id.version
        ))
    }

    async fn create(&self, deployment: &Deployment) -> Result<(), ClientError> {
        self.command(Action::Create, deployment).await
    }

    async fn delete(&self, deployment: &Deployment) -> Result<(), ClientError> {
        self.command(Action::Delete, deployment).await
    }

    async fn modify(&self, _prior: &Deployment, post: &Deployment) -> Result<(), ClientError> {
        self.command(Action::Modify, post).await
    }
}

/// Live cluster state served from a fixed list of deployments.
#[allow(dead_code)]
pub struct FakeClusterState {
    running: Vec<Deployment>,
    fail: bool,
    delay: Option<Duration>,
    queried: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeClusterState {
    pub fn new(running: Vec<Deployment>) -> Self {
        Self {
            running,
            fail: false,
            delay: None,
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Base URLs asked about so far.
    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().clone()
    }
}

#[async_trait]
impl ClusterStateSource for FakeClusterState {
    async fn running_deployment_set(
        &self,
        base_urls: &[String],
    ) -> Result<Deployments, ClientError> {
        self.queried.lock().extend(base_urls.iter().cloned());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ClientError::Unavailable("connection refused".to_string()));
        }
        let deployments = Deployments::new();
        for d in &self.running {
            deployments
                .add(d.clone().with_annotation(Annotation::observed("req-1")))
                .map_err(|e| ClientError::Rejected(e.to_string()))?;
        }
        Ok(deployments)
    }
}

// Copyright (c) 2025 Rajan Panneer Selvam
//
// Licensed under the Business Source License 1.1 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.mariadb.com/bsl11
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Top-level fan-out over (job x role x region) for discovery, static and
//! custom-namespace jobs (spec §4.8). Each task resolves the account
//! identity, builds per-run clients and a processor, runs its job, and
//! appends to shared result slices under a mutex. A `CancellationToken`
//! stops further dispatch once tripped; tasks already spawned are left
//! to the `JoinSet`'s drop-aborts-remaining-tasks behavior.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::clients::cloudwatch::AwsCloudWatchClient;
use crate::clients::tagging::AwsTaggingClient;
use crate::clients::{AccountClient, AwsAccountClient, ClientFactory};
use crate::config::{CustomNamespaceJob, DiscoveryJob, JobsConfig, Role, StaticJob};
use crate::catalog::ServiceCatalog;
use crate::enhanced;
use crate::jobs::{run_custom_namespace_job, run_discovery_job, run_static_job};
use crate::model::{CloudwatchData, ScrapeContext, TaggedResource};

/// The two flat output slices spec §4.8 returns: discovered resources and
/// completed metric datapoints across every job, role and region.
#[derive(Debug, Default)]
pub struct ScrapeOutput {
    pub resources: Vec<TaggedResource>,
    pub metrics: Vec<CloudwatchData>,
}

struct Shared {
    resources: Mutex<Vec<TaggedResource>>,
    metrics: Mutex<Vec<CloudwatchData>>,
}

impl Shared {
    fn new() -> Self {
        Self { resources: Mutex::new(Vec::new()), metrics: Mutex::new(Vec::new()) }
    }

    async fn extend(&self, resources: Vec<TaggedResource>, metrics: Vec<CloudwatchData>) {
        if !resources.is_empty() {
            self.resources.lock().await.extend(resources);
        }
        if !metrics.is_empty() {
            self.metrics.lock().await.extend(metrics);
        }
    }
}

/// Resolves the account ID (fatal on error: the caller logs and skips
/// this task) and the account alias (non-fatal: logged at warn and left
/// `None`) for one (role, region) pair.
async fn resolve_account(region: &str, role: &Role, factory: &ClientFactory) -> Option<ScrapeContext> {
    let sts = factory.sts_client(region, role).await;
    let iam = factory.iam_client(region, role).await;
    let account_client = AwsAccountClient::new(sts, iam);

    let account_id = match account_client.get_account().await {
        Ok(id) => id,
        Err(err) => {
            error!(region, role_arn = %role.role_arn, error = %err, "failed to resolve account id, skipping task");
            return None;
        }
    };

    let account_alias = match account_client.get_account_alias().await {
        Ok(alias) => Some(alias),
        Err(err) => {
            warn!(region, role_arn = %role.role_arn, error = %err, "failed to resolve account alias");
            None
        }
    };

    Some(ScrapeContext { region: region.to_string(), account_id, account_alias, custom_tags: Vec::new() })
}

/// Runs every discovery, static and custom-namespace job across all of
/// its configured roles and regions, merging results into one
/// `ScrapeOutput`.
pub async fn run_scrape(
    cfg: &JobsConfig,
    catalog: Arc<ServiceCatalog>,
    factory: Arc<ClientFactory>,
    enhanced: Arc<enhanced::Processor>,
    cancellation: CancellationToken,
) -> ScrapeOutput {
    let shared = Arc::new(Shared::new());
    let tagging_concurrency = Arc::new(Semaphore::new(cfg.tagging_api_concurrency.max(1)));
    let mut tasks = JoinSet::new();

    'discovery: for job in cfg.discovery.jobs.clone() {
        let exported_tags = cfg.discovery.exported_tags_on_metrics.get(&job.namespace).cloned().unwrap_or_default();
        for role in job.roles.clone() {
            for region in job.regions.clone() {
                if cancellation.is_cancelled() {
                    break 'discovery;
                }
                let shared = shared.clone();
                let factory = factory.clone();
                let catalog = catalog.clone();
                let enhanced = enhanced.clone();
                let tagging_concurrency = tagging_concurrency.clone();
                let job = job.clone();
                let exported_tags = exported_tags.clone();
                let metrics_per_query = cfg.metrics_per_query;
                let gmd_concurrency = cfg.cloudwatch_concurrency.get_metric_data;

                tasks.spawn(async move {
                    run_discovery_task(
                        job,
                        role,
                        region,
                        exported_tags,
                        factory,
                        catalog,
                        enhanced,
                        tagging_concurrency,
                        metrics_per_query,
                        gmd_concurrency,
                        shared,
                    )
                    .await;
                });
            }
        }
    }

    'static_jobs: for job in cfg.static_jobs.clone() {
        for role in job.roles.clone() {
            for region in job.regions.clone() {
                if cancellation.is_cancelled() {
                    break 'static_jobs;
                }
                let shared = shared.clone();
                let factory = factory.clone();
                let job = job.clone();
                let metrics_per_query = cfg.metrics_per_query;
                let gmd_concurrency = cfg.cloudwatch_concurrency.get_metric_data;

                tasks.spawn(async move {
                    run_static_task(job, role, region, factory, metrics_per_query, gmd_concurrency, shared).await;
                });
            }
        }
    }

    'custom_namespace: for job in cfg.custom_namespace_jobs.clone() {
        for role in job.roles.clone() {
            for region in job.regions.clone() {
                if cancellation.is_cancelled() {
                    break 'custom_namespace;
                }
                let shared = shared.clone();
                let factory = factory.clone();
                let job = job.clone();
                let metrics_per_query = cfg.metrics_per_query;
                let gmd_concurrency = cfg.cloudwatch_concurrency.get_metric_data;

                tasks.spawn(async move {
                    run_custom_namespace_task(job, role, region, factory, metrics_per_query, gmd_concurrency, shared)
                        .await;
                });
            }
        }
    }

    loop {
        tokio::select! {
            joined = tasks.join_next() => {
                let Some(joined) = joined else { break };
                if let Err(join_err) = joined {
                    error!(error = %join_err, "scrape task panicked");
                }
            }
            _ = cancellation.cancelled() => {
                warn!(remaining = tasks.len(), "scrape cancelled, aborting in-flight tasks");
                break;
            }
        }
    }

    let resources = std::mem::take(&mut *shared.resources.lock().await);
    let metrics = std::mem::take(&mut *shared.metrics.lock().await);
    ScrapeOutput { resources, metrics }
}

#[allow(clippy::too_many_arguments)]
async fn run_discovery_task(
    job: DiscoveryJob,
    role: Role,
    region: String,
    exported_tags: Vec<String>,
    factory: Arc<ClientFactory>,
    catalog: Arc<ServiceCatalog>,
    enhanced: Arc<enhanced::Processor>,
    tagging_concurrency: Arc<Semaphore>,
    metrics_per_query: usize,
    gmd_concurrency: usize,
    shared: Arc<Shared>,
) {
    let Some(ctx) = resolve_account(&region, &role, &factory).await else { return };

    let tagging = Arc::new(AwsTaggingClient::new(factory.tagging_client(&region, &role).await, tagging_concurrency));
    let cloudwatch = Arc::new(AwsCloudWatchClient::new(factory.cloudwatch_client(&region, &role).await));
    let processor = crate::processor::GetMetricDataProcessor::new(cloudwatch.clone(), metrics_per_query, gmd_concurrency);

    let (resources, mut metrics) =
        run_discovery_job(&job, &region, &exported_tags, tagging, cloudwatch, &processor, &catalog).await;

    let requested_metric_names: Vec<String> = job.metrics.iter().map(|m| m.name.clone()).collect();
    match enhanced.process(&job.namespace, &resources, &requested_metric_names, &exported_tags).await {
        Ok(enhanced_metrics) => metrics.extend(enhanced_metrics),
        Err(err) => error!(
            namespace = %job.namespace, region = %ctx.region, account_id = %ctx.account_id, error = %err,
            "enhanced-metrics processor failed"
        ),
    }

    info!(
        namespace = %job.namespace, region = %ctx.region, account_id = %ctx.account_id,
        resources = resources.len(), metrics = metrics.len(), "discovery job complete"
    );
    shared.extend(resources, metrics).await;
}

async fn run_static_task(
    job: StaticJob,
    role: Role,
    region: String,
    factory: Arc<ClientFactory>,
    metrics_per_query: usize,
    gmd_concurrency: usize,
    shared: Arc<Shared>,
) {
    let Some(ctx) = resolve_account(&region, &role, &factory).await else { return };

    let cloudwatch = Arc::new(AwsCloudWatchClient::new(factory.cloudwatch_client(&region, &role).await));
    let processor = crate::processor::GetMetricDataProcessor::new(cloudwatch, metrics_per_query, gmd_concurrency);

    let metrics = run_static_job(&job, &processor).await;
    info!(job = %job.name, region = %ctx.region, account_id = %ctx.account_id, metrics = metrics.len(), "static job complete");
    shared.extend(Vec::new(), metrics).await;
}

async fn run_custom_namespace_task(
    job: CustomNamespaceJob,
    role: Role,
    region: String,
    factory: Arc<ClientFactory>,
    metrics_per_query: usize,
    gmd_concurrency: usize,
    shared: Arc<Shared>,
) {
    let Some(ctx) = resolve_account(&region, &role, &factory).await else { return };

    let cloudwatch = Arc::new(AwsCloudWatchClient::new(factory.cloudwatch_client(&region, &role).await));
    let processor = crate::processor::GetMetricDataProcessor::new(cloudwatch.clone(), metrics_per_query, gmd_concurrency);

    let metrics = run_custom_namespace_job(&job, &region, cloudwatch, &processor).await;
    info!(
        job = %job.name, region = %ctx.region, account_id = %ctx.account_id, metrics = metrics.len(),
        "custom-namespace job complete"
    );
    shared.extend(Vec::new(), metrics).await;
}

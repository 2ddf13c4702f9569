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

//! End-to-end scenarios exercised against the crate's public API rather
//! than internal module seams.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cw_scrape::catalog::ServiceCatalog;
use cw_scrape::clients::cloudwatch::{CloudWatchClient, CloudWatchError, MetricDataQueryInput, MetricDataResult};
use cw_scrape::clients::enhanced::{EnhancedClientError, RdsClient, RdsInstance};
use cw_scrape::clients::tagging::{ResourceDiscoveryRequest, TaggingClient, TaggingError};
use cw_scrape::config::{self, CustomNamespaceJob, DiscoveryConfig, DiscoveryJob, JobsConfig, MetricConfig, Role};
use cw_scrape::enhanced::{Processor, RdsService};
use cw_scrape::jobs::run_discovery_job;
use cw_scrape::model::{Dimension, Metric, TaggedResource};
use cw_scrape::processor::GetMetricDataProcessor;

struct StubTagging {
    resources: Vec<TaggedResource>,
}

#[async_trait]
impl TaggingClient for StubTagging {
    async fn get_resources(&self, _: &ResourceDiscoveryRequest) -> Result<Vec<TaggedResource>, TaggingError> {
        Ok(self.resources.clone())
    }
}

struct StubCloudWatch {
    metrics: Vec<Metric>,
}

#[async_trait]
impl CloudWatchClient for StubCloudWatch {
    async fn list_metrics(&self, _: &str, _: &str, _: bool) -> Result<Vec<Metric>, CloudWatchError> {
        Ok(self.metrics.clone())
    }

    async fn get_metric_data(
        &self,
        queries: &[MetricDataQueryInput],
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<MetricDataResult>, CloudWatchError> {
        Ok(queries
            .iter()
            .map(|q| MetricDataResult { id: q.id.clone(), datapoint: Some(42.0), timestamp: Some(Utc::now()) })
            .collect())
    }
}

fn cpu_metric_config() -> MetricConfig {
    MetricConfig {
        name: "CPUUtilization".to_string(),
        statistics: vec!["Average".to_string(), "Sum".to_string()],
        period: 300,
        length: 300,
        delay: 0,
        nil_to_zero: false,
        add_cloudwatch_timestamp: false,
        export_all_data_points: false,
    }
}

/// ListMetrics returns 3 dimension sets for one metric with two
/// statistics; GetMetricData must resolve all 6 query IDs and hand back
/// 6 completed `CloudwatchData`, all populated and none still pending.
#[tokio::test]
async fn list_metrics_to_get_metric_data_roundtrip_resolves_all_ids() {
    let job = DiscoveryJob {
        namespace: "AWS/EC2".to_string(),
        regions: vec!["us-east-1".to_string()],
        roles: vec![Role::default()],
        metrics: vec![cpu_metric_config()],
        dimension_name_requirements: None,
        recently_active_only: false,
    };

    let resources: Vec<TaggedResource> = (0..3)
        .map(|i| TaggedResource::new(format!("arn:aws:ec2:us-east-1:123456789012:instance/i-{i}"), "AWS/EC2", "us-east-1"))
        .collect();
    let metrics: Vec<Metric> = (0..3)
        .map(|i| Metric {
            namespace: "AWS/EC2".to_string(),
            metric_name: "CPUUtilization".to_string(),
            dimensions: vec![Dimension::new("InstanceId", format!("i-{i}"))],
        })
        .collect();

    let tagging = Arc::new(StubTagging { resources });
    let cloudwatch = Arc::new(StubCloudWatch { metrics });
    let processor = GetMetricDataProcessor::new(cloudwatch.clone(), 500, 4);
    let catalog = ServiceCatalog::builtin();

    let (discovered, completed) =
        run_discovery_job(&job, "us-east-1", &[], tagging, cloudwatch, &processor, &catalog).await;

    assert_eq!(discovered.len(), 3);
    assert_eq!(completed.len(), 6);
    assert!(completed.iter().all(|c| c.is_done()));
}

struct StubRds {
    instances: Vec<RdsInstance>,
}

#[async_trait]
impl RdsClient for StubRds {
    async fn describe_instances(&self, _region: &str) -> Result<Vec<RdsInstance>, EnhancedClientError> {
        Ok(self.instances.clone())
    }
}

/// Two RDS resources in one region; requesting `[StorageSpace,
/// UnsupportedMetric]` yields exactly two `StorageSpace` datapoints
/// (the unsupported metric is silently dropped, not erred on) valued at
/// each instance's allocated storage.
#[tokio::test]
async fn rds_enhanced_metrics_report_allocated_storage() {
    let resources = vec![
        TaggedResource::new("arn:aws:rds:us-east-1:123456789012:db:db-a", "AWS/RDS", "us-east-1"),
        TaggedResource::new("arn:aws:rds:us-east-1:123456789012:db:db-b", "AWS/RDS", "us-east-1"),
    ];
    let client = Arc::new(StubRds {
        instances: vec![
            RdsInstance {
                arn: resources[0].arn.clone(),
                db_instance_identifier: "db-a".to_string(),
                database_class: "db.r5.large".to_string(),
                engine_name: "postgres".to_string(),
                allocated_storage_gb: 100.0,
            },
            RdsInstance {
                arn: resources[1].arn.clone(),
                db_instance_identifier: "db-b".to_string(),
                database_class: "db.r5.xlarge".to_string(),
                engine_name: "postgres".to_string(),
                allocated_storage_gb: 16384.0,
            },
        ],
    });

    let mut registry = Processor::new();
    registry.register(Arc::new(RdsService::new(client)));

    let out = registry
        .process("AWS/RDS", &resources, &["StorageSpace".to_string(), "UnsupportedMetric".to_string()], &[])
        .await
        .unwrap();

    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|c| c.metric_name == "StorageSpace"));
    let values: Vec<f64> = out
        .iter()
        .map(|c| match &c.state {
            cw_scrape::model::RequestState::Done(r) => r.datapoint.unwrap(),
            cw_scrape::model::RequestState::Pending(_) => panic!("expected a populated result"),
        })
        .collect();
    assert!(values.contains(&100.0));
    assert!(values.contains(&16384.0));
}

/// A config with no discovery/static/custom jobs at all is a valid,
/// if useless, configuration — validation only rejects what spec.md §6
/// explicitly names, not emptiness.
#[tokio::test]
async fn empty_jobs_config_is_valid() {
    let cfg = JobsConfig {
        api_version: config::API_VERSION.to_string(),
        sts_region: None,
        discovery: DiscoveryConfig::default(),
        static_jobs: Vec::new(),
        custom_namespace_jobs: Vec::new(),
        metrics_per_query: 500,
        cloudwatch_concurrency: Default::default(),
        tagging_api_concurrency: 5,
    };
    assert!(config::validate(&cfg, &ServiceCatalog::builtin()).is_ok());
}

/// A custom-namespace job with an empty region list fails validation
/// with the literal message spec.md §6 names, even though the job is
/// otherwise well-formed.
#[tokio::test]
async fn custom_namespace_job_without_regions_is_rejected() {
    let mut cfg = JobsConfig {
        api_version: config::API_VERSION.to_string(),
        sts_region: None,
        discovery: DiscoveryConfig::default(),
        static_jobs: Vec::new(),
        custom_namespace_jobs: vec![CustomNamespaceJob {
            name: "my-custom".to_string(),
            namespace: "Custom/Foo".to_string(),
            regions: Vec::new(),
            roles: vec![Role::default()],
            metrics: vec![cpu_metric_config()],
            dimension_name_requirements: None,
        }],
        metrics_per_query: 500,
        cloudwatch_concurrency: Default::default(),
        tagging_api_concurrency: 5,
    };
    let err = config::validate(&cfg, &ServiceCatalog::builtin()).unwrap_err();
    assert!(err.to_string().contains("at least one region"));

    cfg.custom_namespace_jobs[0].regions.push("us-east-1".to_string());
    assert!(config::validate(&cfg, &ServiceCatalog::builtin()).is_ok());
}

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

//! Declarative scrape configuration: discovery/static/custom-namespace
//! jobs, roles, metrics, and the validation rules in spec §6.

use std::collections::HashMap;
use std::env;

use config::{Config as ConfigFile, Environment, File};
use serde::{Deserialize, Serialize};

use crate::catalog::ServiceCatalog;
use crate::errors::AppError;

pub const API_VERSION: &str = "v1alpha1";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobsConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(rename = "sts-region", default)]
    pub sts_region: Option<String>,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub static_jobs: Vec<StaticJob>,
    #[serde(rename = "customNamespace", default)]
    pub custom_namespace_jobs: Vec<CustomNamespaceJob>,
    #[serde(rename = "metricsPerQuery", default = "default_metrics_per_query")]
    pub metrics_per_query: usize,
    #[serde(rename = "cloudwatchConcurrency", default)]
    pub cloudwatch_concurrency: CloudwatchConcurrency,
    #[serde(rename = "taggingAPIConcurrency", default = "default_tagging_api_concurrency")]
    pub tagging_api_concurrency: usize,
}

fn default_metrics_per_query() -> usize {
    500
}

fn default_tagging_api_concurrency() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudwatchConcurrency {
    #[serde(rename = "getMetricData", default = "default_get_metric_data_concurrency")]
    pub get_metric_data: usize,
}

fn default_get_metric_data_concurrency() -> usize {
    5
}

impl Default for CloudwatchConcurrency {
    fn default() -> Self {
        Self { get_metric_data: default_get_metric_data_concurrency() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscoveryConfig {
    #[serde(rename = "exportedTagsOnMetrics", default)]
    pub exported_tags_on_metrics: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub jobs: Vec<DiscoveryJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryJob {
    #[serde(rename = "type")]
    pub namespace: String,
    pub regions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub metrics: Vec<MetricConfig>,
    #[serde(rename = "dimensionNameRequirements", default)]
    pub dimension_name_requirements: Option<Vec<String>>,
    #[serde(rename = "recentlyActiveOnly", default)]
    pub recently_active_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticJob {
    pub name: String,
    pub namespace: String,
    pub regions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub dimensions: Vec<StaticDimensionSet>,
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticDimensionSet {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomNamespaceJob {
    pub name: String,
    pub namespace: String,
    pub regions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub metrics: Vec<MetricConfig>,
    #[serde(rename = "dimensionNameRequirements", default)]
    pub dimension_name_requirements: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub struct Role {
    #[serde(rename = "roleArn", default)]
    pub role_arn: String,
    #[serde(rename = "externalId", default)]
    pub external_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
    pub statistics: Vec<String>,
    pub period: i64,
    pub length: i64,
    #[serde(default)]
    pub delay: i64,
    #[serde(rename = "nilToZero", default)]
    pub nil_to_zero: bool,
    #[serde(rename = "addCloudwatchTimestamp", default)]
    pub add_cloudwatch_timestamp: bool,
    #[serde(rename = "exportAllDataPoints", default)]
    pub export_all_data_points: bool,
}

/// Validate a loaded `JobsConfig` against the rules in spec §6, returning
/// the first violation as the literal error message the spec names.
pub fn validate(cfg: &JobsConfig, catalog: &ServiceCatalog) -> Result<(), AppError> {
    if cfg.api_version != API_VERSION {
        return Err(AppError::Config(format!(
            "unknown apiVersion value '{}'",
            cfg.api_version
        )));
    }

    for (ns, _) in &cfg.discovery.exported_tags_on_metrics {
        let matches_some_job = cfg.discovery.jobs.iter().any(|j| &j.namespace == ns);
        if !matches_some_job {
            return Err(AppError::Config(format!(
                "'exportedTagsOnMetrics' key \"{}\" does not match with any discovery job type",
                ns
            )));
        }
    }

    for job in &cfg.discovery.jobs {
        validate_namespace(&job.namespace, catalog)?;
        validate_regions(&job.regions)?;
        validate_roles(&job.roles)?;
        validate_metrics(&job.metrics)?;
    }

    for job in &cfg.static_jobs {
        validate_regions(&job.regions)?;
        validate_roles(&job.roles)?;
        validate_metrics(&job.metrics)?;
    }

    for job in &cfg.custom_namespace_jobs {
        if job.name.is_empty() {
            return Err(AppError::Config("customNamespace job name must not be empty".to_string()));
        }
        if job.namespace.is_empty() {
            return Err(AppError::Config("customNamespace job namespace must not be empty".to_string()));
        }
        validate_regions(&job.regions)?;
        validate_roles(&job.roles)?;
        validate_metrics(&job.metrics)?;
    }

    Ok(())
}

fn validate_namespace(namespace: &str, catalog: &ServiceCatalog) -> Result<(), AppError> {
    if let Some(canonical) = catalog.alias_canonical_name(namespace) {
        return Err(AppError::Config(format!(
            "Invalid 'type' field, use namespace \"{}\" rather than alias \"{}\"",
            canonical, namespace
        )));
    }
    if catalog.get_service(namespace).is_none() {
        return Err(AppError::Config(format!("Service is not in known list!: {}", namespace)));
    }
    Ok(())
}

fn validate_regions(regions: &[String]) -> Result<(), AppError> {
    if regions.is_empty() {
        return Err(AppError::Config("job must declare at least one region".to_string()));
    }
    Ok(())
}

fn validate_roles(roles: &[Role]) -> Result<(), AppError> {
    if roles.is_empty() {
        return Err(AppError::Config("job must declare at least one role".to_string()));
    }
    for role in roles {
        if !role.external_id.is_empty() && role.role_arn.is_empty() {
            return Err(AppError::Config("RoleArn should not be empty".to_string()));
        }
    }
    Ok(())
}

fn validate_metrics(metrics: &[MetricConfig]) -> Result<(), AppError> {
    if metrics.is_empty() {
        return Err(AppError::Config("job must declare at least one metric".to_string()));
    }
    for metric in metrics {
        if metric.statistics.is_empty() {
            return Err(AppError::Config(format!("metric '{}' must declare at least one statistic", metric.name)));
        }
        if metric.period <= 0 {
            return Err(AppError::Config(format!("metric '{}' period must be greater than zero", metric.name)));
        }
        if metric.length < metric.period {
            return Err(AppError::Config(format!("metric '{}' length must be at least period", metric.name)));
        }
        if metric.delay < 0 {
            return Err(AppError::Config(format!("metric '{}' delay must not be negative", metric.name)));
        }
    }
    Ok(())
}

/// Load scrape configuration from a default file, a named file, and
/// `CWSCRAPE__`-prefixed environment variables, in that layering order.
pub fn load_config() -> Result<JobsConfig, AppError> {
    dotenv::dotenv().ok();

    let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config".to_string());

    let raw = ConfigFile::builder()
        .add_source(File::with_name(&format!("{}.default", config_path)).required(false))
        .add_source(File::with_name(&config_path).required(false))
        .add_source(Environment::with_prefix("CWSCRAPE").separator("__"))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    raw.try_deserialize()
        .map_err(|e| AppError::Config(e.to_string()))
}

/// Load and validate in one step; the entry point `main` and tests use.
pub fn load_and_validate(catalog: &ServiceCatalog) -> Result<JobsConfig, AppError> {
    let cfg = load_config()?;
    validate(&cfg, catalog)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_job() -> DiscoveryJob {
        DiscoveryJob {
            namespace: "AWS/EC2".to_string(),
            regions: vec!["us-east-1".to_string()],
            roles: vec![Role::default()],
            metrics: vec![MetricConfig {
                name: "CPUUtilization".to_string(),
                statistics: vec!["Average".to_string()],
                period: 300,
                length: 300,
                delay: 0,
                nil_to_zero: false,
                add_cloudwatch_timestamp: false,
                export_all_data_points: false,
            }],
            dimension_name_requirements: None,
            recently_active_only: false,
        }
    }

    fn base_cfg() -> JobsConfig {
        JobsConfig {
            api_version: API_VERSION.to_string(),
            discovery: DiscoveryConfig {
                exported_tags_on_metrics: HashMap::new(),
                jobs: vec![base_job()],
            },
            ..Default::default()
        }
    }

    #[test]
    fn unknown_version() {
        let mut cfg = base_cfg();
        cfg.api_version = "v2".to_string();
        let err = validate(&cfg, &ServiceCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("unknown apiVersion value 'v2'"));
    }

    #[test]
    fn externalid_without_rolearn() {
        let mut cfg = base_cfg();
        cfg.discovery.jobs[0].roles = vec![Role { role_arn: String::new(), external_id: "ext".to_string() }];
        let err = validate(&cfg, &ServiceCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("RoleArn should not be empty"));
    }

    #[test]
    fn custom_namespace_without_name() {
        let mut cfg = base_cfg();
        cfg.custom_namespace_jobs.push(CustomNamespaceJob {
            name: String::new(),
            namespace: "Custom/Foo".to_string(),
            regions: vec!["us-east-1".to_string()],
            roles: vec![Role::default()],
            metrics: vec![base_job().metrics.remove(0)],
            dimension_name_requirements: None,
        });
        let err = validate(&cfg, &ServiceCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("customNamespace job name must not be empty"));
    }

    #[test]
    fn discovery_job_type_alias() {
        let mut cfg = base_cfg();
        cfg.discovery.jobs[0].namespace = "ec2".to_string();
        let err = validate(&cfg, &ServiceCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("use namespace \"AWS/EC2\" rather than alias \"ec2\""));
    }

    #[test]
    fn discovery_job_exported_tags_mismatch() {
        let mut cfg = base_cfg();
        cfg.discovery.exported_tags_on_metrics.insert("AWS/S3".to_string(), vec!["Name".to_string()]);
        let err = validate(&cfg, &ServiceCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("'exportedTagsOnMetrics' key \"AWS/S3\" does not match with any discovery job type"));
    }

    #[test]
    fn valid_config_passes() {
        let cfg = base_cfg();
        assert!(validate(&cfg, &ServiceCatalog::builtin()).is_ok());
    }
}

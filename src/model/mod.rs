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

//! Core data model shared by the associator, batch processor, job runners
//! and aggregator: tagged resources, CloudWatch metrics, and the
//! request/result objects that flow through a scrape.

use std::collections::HashMap;

/// A resource discovered via the tagging API (or synthesized for
/// unassociated "global" metrics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedResource {
    pub arn: String,
    pub namespace: String,
    pub region: String,
    /// Ordered to match discovery order; callers needing a specific tag
    /// value look it up by key.
    pub tags: Vec<(String, String)>,
}

impl TaggedResource {
    pub fn new(arn: impl Into<String>, namespace: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            namespace: namespace.into(),
            region: region.into(),
            tags: Vec::new(),
        }
    }

    /// The synthetic resource unresolved-but-kept metrics are attached to.
    pub fn global(namespace: impl Into<String>) -> Self {
        Self {
            arn: "global".to_string(),
            namespace: namespace.into(),
            region: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// A single (name, value) dimension pair qualifying a metric series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// A metric series as returned by ListMetrics, before any per-statistic
/// request objects are built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
}

impl Metric {
    pub fn dimension_names(&self) -> std::collections::HashSet<&str> {
        self.dimensions.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn dimension_map(&self) -> HashMap<&str, &str> {
        self.dimensions.iter().map(|d| (d.name.as_str(), d.value.as_str())).collect()
    }
}

/// What's left of a `CloudwatchData` request before its batch runs: the
/// window parameters and statistic the GetMetricData processor needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingParams {
    pub period: i64,
    pub length: i64,
    pub delay: i64,
    pub statistic: String,
}

/// What a `CloudwatchData` request becomes once the processor has mapped
/// a datapoint back to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub statistic: String,
    pub datapoint: Option<f64>,
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

/// `CloudwatchData`'s "exactly one of Result / ProcessingParams populated"
/// invariant (spec §3), rendered as a Rust state machine instead of two
/// always-present optional fields.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    Pending(ProcessingParams),
    Done(MetricResult),
}

/// Request+result object threaded through ListMetrics -> associate ->
/// iterate -> GetMetricData -> compact.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudwatchData {
    pub metric_name: String,
    pub resource_name: String,
    pub namespace: String,
    pub dimensions: Vec<Dimension>,
    pub tags: Vec<(String, String)>,
    pub nil_to_zero: bool,
    pub add_cloudwatch_timestamp: bool,
    pub query_id: Option<String>,
    pub state: RequestState,
}

impl CloudwatchData {
    pub fn new_pending(
        metric_name: impl Into<String>,
        resource_name: impl Into<String>,
        namespace: impl Into<String>,
        dimensions: Vec<Dimension>,
        tags: Vec<(String, String)>,
        params: ProcessingParams,
        nil_to_zero: bool,
        add_cloudwatch_timestamp: bool,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            resource_name: resource_name.into(),
            namespace: namespace.into(),
            dimensions,
            tags,
            nil_to_zero,
            add_cloudwatch_timestamp,
            query_id: None,
            state: RequestState::Pending(params),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, RequestState::Done(_))
    }

    pub fn processing_params(&self) -> Option<&ProcessingParams> {
        match &self.state {
            RequestState::Pending(p) => Some(p),
            RequestState::Done(_) => None,
        }
    }

    /// Populate the result and clear the processing params, per spec §4.3
    /// step 4. A no-op if this request is already `Done` (the
    /// `if result == nil` guard against duplicate IDs in a response).
    pub fn complete(&mut self, datapoint: Option<f64>, timestamp: Option<chrono::DateTime<chrono::Utc>>) {
        if let RequestState::Pending(params) = &self.state {
            self.state = RequestState::Done(MetricResult {
                statistic: params.statistic.clone(),
                datapoint,
                timestamp,
            });
        }
    }
}

/// Per (job, role, region) execution context.
#[derive(Debug, Clone, Default)]
pub struct ScrapeContext {
    pub region: String,
    pub account_id: String,
    pub account_alias: Option<String>,
    pub custom_tags: Vec<(String, String)>,
}

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

//! Groups per-metric requests by window and slices each group into
//! size-bounded batches (spec §4.3 "Batching"), and computes the
//! `[start, end]` window for a `(period, length, delay)` triple (spec
//! §4.4 "Window Calculator").

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{CloudwatchData, ProcessingParams};

/// The window tuple every member of a batch shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub period: i64,
    pub length: i64,
    pub delay: i64,
}

impl From<&ProcessingParams> for WindowKey {
    fn from(p: &ProcessingParams) -> Self {
        Self { period: p.period, length: p.length, delay: p.delay }
    }
}

/// Given `(period, length, delay)` and a clock, compute the window per
/// spec §4.4: `end = floor(now - delay, period)`, `start = end - length`.
pub fn compute_window(window: WindowKey, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let shifted = now.timestamp() - window.delay;
    let period = window.period.max(1);
    let end_secs = shifted.div_euclid(period) * period;
    let start_secs = end_secs - window.length;
    (
        DateTime::<Utc>::from_timestamp(start_secs, 0).unwrap_or(now),
        DateTime::<Utc>::from_timestamp(end_secs, 0).unwrap_or(now),
    )
}

/// Groups `requests` by window and slices each group into chunks of at
/// most `metrics_per_query`, preserving input order within a group.
/// Ordering across groups is unspecified, matching spec §4.3.
pub fn iterate(requests: Vec<CloudwatchData>, metrics_per_query: usize) -> Vec<(WindowKey, Vec<CloudwatchData>)> {
    let metrics_per_query = metrics_per_query.max(1);
    let mut groups: HashMap<WindowKey, Vec<CloudwatchData>> = HashMap::new();
    let mut order: Vec<WindowKey> = Vec::new();

    for request in requests {
        let Some(params) = request.processing_params() else {
            continue;
        };
        let key = WindowKey::from(params);
        if !groups.contains_key(&key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(request);
    }

    let mut batches = Vec::new();
    for key in order {
        let members = groups.remove(&key).unwrap_or_default();
        for chunk in members.chunks(metrics_per_query) {
            batches.push((key, chunk.to_vec()));
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dimension;

    fn request(period: i64, length: i64, delay: i64) -> CloudwatchData {
        CloudwatchData::new_pending(
            "CPUUtilization",
            "i-abc",
            "AWS/EC2",
            vec![Dimension::new("InstanceId", "i-abc")],
            vec![],
            ProcessingParams { period, length, delay, statistic: "Average".to_string() },
            false,
            false,
        )
    }

    #[test]
    fn window_alignment() {
        let now = DateTime::<Utc>::from_timestamp(1_000_000, 0).unwrap();
        let window = WindowKey { period: 300, length: 600, delay: 60 };
        let (start, end) = compute_window(window, now);
        assert_eq!(end.timestamp() % window.period, 0);
        assert_eq!(end.timestamp() - start.timestamp(), window.length);
    }

    #[test]
    fn batch_uniformity_and_cap() {
        let requests: Vec<_> = (0..5).map(|_| request(300, 300, 0)).collect();
        let batches = iterate(requests, 2);
        assert_eq!(batches.len(), 3);
        for (key, members) in &batches {
            assert!(members.len() <= 2);
            for m in members {
                assert_eq!(WindowKey::from(m.processing_params().unwrap()), *key);
            }
        }
    }

    #[test]
    fn distinct_windows_form_distinct_groups() {
        let mut requests = vec![request(300, 300, 0), request(300, 300, 0)];
        requests.push(request(60, 60, 0));
        let batches = iterate(requests, 100);
        assert_eq!(batches.len(), 2);
    }
}

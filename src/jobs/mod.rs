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

//! Top-level orchestration per job type (spec §4.2, §4.5, §4.6): discovery
//! (tagging + ListMetrics + associate), static (no discovery at all), and
//! custom-namespace (ListMetrics without an associator).

pub mod custom_namespace;
pub mod discovery;
pub mod static_job;

pub use custom_namespace::run_custom_namespace_job;
pub use discovery::run_discovery_job;
pub use static_job::run_static_job;

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

use thiserror::Error;

/// One variant per failure domain named in spec §7: config validation is
/// fail-fast and bubbles to the caller; client/fatal errors are localised
/// to the smallest enclosing task by the code that produces them and
/// never propagate as `AppError` past that task (see `jobs`, `processor`,
/// `enhanced`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cloud client error: {0}")]
    ClientError(String),

    #[error("fatal error: {0}")]
    Fatal(String),
}

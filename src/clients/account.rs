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

use async_trait::async_trait;
use aws_sdk_iam::Client as IamSdkClient;
use aws_sdk_sts::Client as StsSdkClient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account resolution error: {0}")]
    Other(String),
}

#[async_trait]
pub trait AccountClient: Send + Sync {
    async fn get_account(&self) -> Result<String, AccountError>;
    async fn get_account_alias(&self) -> Result<String, AccountError>;
}

pub struct AwsAccountClient {
    sts: StsSdkClient,
    iam: IamSdkClient,
}

impl AwsAccountClient {
    pub fn new(sts: StsSdkClient, iam: IamSdkClient) -> Self {
        Self { sts, iam }
    }
}

#[async_trait]
impl AccountClient for AwsAccountClient {
    async fn get_account(&self) -> Result<String, AccountError> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| AccountError::Other(e.to_string()))?;
        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| AccountError::Other("GetCallerIdentity returned no account".to_string()))
    }

    async fn get_account_alias(&self) -> Result<String, AccountError> {
        let response = self
            .iam
            .list_account_aliases()
            .send()
            .await
            .map_err(|e| AccountError::Other(e.to_string()))?;
        response
            .account_aliases()
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| AccountError::Other("account has no alias configured".to_string()))
    }
}

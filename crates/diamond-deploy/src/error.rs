// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use alloy::primitives::Address;
use thiserror::Error;

/// Errors returned by the deployment and upgrade operations.
///
/// Per-facet deployment failures and failed cut transactions are not represented here. Those
/// are recorded as outcomes in the returned report and in the ledger.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("{0}")]
    PreconditionViolation(String),

    #[error("Chain submission failed: {0:#}")]
    ChainSubmission(anyhow::Error),

    #[error("Verification of {address} failed: {message}")]
    Verification { address: Address, message: String },
}

impl DeployError {
    pub(crate) fn config(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Config { path: path.into(), message: message.to_string() }
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation(message.into())
    }

    /// Returns true if this error was raised before any chain interaction because an input or
    /// the ledger did not satisfy the operation's requirements.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::PreconditionViolation(_))
    }
}

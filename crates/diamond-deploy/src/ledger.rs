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

//! Persistent record of the diamond proxies deployed to a network and the cuts applied to them.

use std::{collections::BTreeMap, fmt, ops::Range};

use alloy::primitives::{Address, Selector, B256};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::DeployError;

/// Action of a single facet cut. The discriminants match the `uint8` values expected by the
/// `diamondCut` function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum FacetCutAction {
    Add = 0,
    Replace = 1,
    Remove = 2,
}

impl FacetCutAction {
    /// Whether the action routes selectors to a facet, and so needs a non-zero facet address.
    pub fn requires_target(self) -> bool {
        !matches!(self, Self::Remove)
    }
}

impl fmt::Display for FacetCutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "ADD"),
            Self::Replace => write!(f, "REPLACE"),
            Self::Remove => write!(f, "REMOVE"),
        }
    }
}

/// Outcome of the diamond cut transaction a [CutRecord] was part of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "true")]
    Succeeded,
    #[serde(rename = "false")]
    Failed,
}

/// One attempt to change the routing of a set of selectors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutRecord {
    pub facet_name: String,
    pub facet_address: Address,
    pub selectors: Vec<Selector>,
    pub action: FacetCutAction,
    /// RFC 3339 time of the attempt.
    pub timestamp: String,
    pub is_diamond_cut_success: CutStatus,
}

impl CutRecord {
    /// Create a record timestamped now.
    pub fn new(
        facet_name: impl Into<String>,
        facet_address: Address,
        selectors: Vec<Selector>,
        action: FacetCutAction,
        status: CutStatus,
    ) -> Self {
        Self {
            facet_name: facet_name.into(),
            facet_address,
            selectors,
            action,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            is_diamond_cut_success: status,
        }
    }
}

/// Ledger entry for a single diamond proxy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRecord {
    pub address: Address,
    /// Zero when the deployment transaction was not known at the time of recording.
    #[serde(alias = "txHash", default)]
    pub deployment_transaction_hash: B256,
    #[serde(default)]
    pub cuts: Vec<CutRecord>,
}

/// All diamond proxies known on one network, keyed by proxy contract name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiamondLedger {
    proxies: BTreeMap<String, ProxyRecord>,
}

impl DiamondLedger {
    pub fn get(&self, proxy_name: &str) -> Option<&ProxyRecord> {
        self.proxies.get(proxy_name)
    }

    pub fn contains(&self, proxy_name: &str) -> bool {
        self.proxies.contains_key(proxy_name)
    }

    pub fn proxy_names(&self) -> impl Iterator<Item = &str> {
        self.proxies.keys().map(String::as_str)
    }

    /// Record a newly deployed proxy. A proxy address is assigned exactly once.
    pub fn insert_proxy(
        &mut self,
        proxy_name: &str,
        address: Address,
        deployment_transaction_hash: B256,
    ) -> Result<(), DeployError> {
        if let Some(existing) = self.proxies.get(proxy_name) {
            return Err(DeployError::precondition(format!(
                "Diamond proxy [{proxy_name}] is already recorded at [{}]",
                existing.address
            )));
        }
        self.proxies.insert(
            proxy_name.to_string(),
            ProxyRecord { address, deployment_transaction_hash, cuts: Vec::new() },
        );
        Ok(())
    }

    /// Append a batch of cut records to a proxy and return the index range of the batch.
    pub fn append_batch(
        &mut self,
        proxy_name: &str,
        records: impl IntoIterator<Item = CutRecord>,
    ) -> Result<Range<usize>, DeployError> {
        let proxy = self.proxy_mut(proxy_name)?;
        let start = proxy.cuts.len();
        proxy.cuts.extend(records);
        Ok(start..proxy.cuts.len())
    }

    /// Settle the pending records of one batch. Records outside `batch`, and records of the
    /// batch that are not pending, keep their status.
    pub fn resolve_batch(
        &mut self,
        proxy_name: &str,
        batch: Range<usize>,
        succeeded: bool,
    ) -> Result<(), DeployError> {
        let status = if succeeded { CutStatus::Succeeded } else { CutStatus::Failed };
        let proxy = self.proxy_mut(proxy_name)?;
        let Some(records) = proxy.cuts.get_mut(batch.clone()) else {
            return Err(DeployError::precondition(format!(
                "Cut batch {batch:?} is out of range for diamond proxy [{proxy_name}]"
            )));
        };
        records
            .iter_mut()
            .filter(|record| record.is_diamond_cut_success == CutStatus::Pending)
            .for_each(|record| record.is_diamond_cut_success = status);
        Ok(())
    }

    /// Whether `facet_address` was already cut into the proxy for any of the given selectors.
    ///
    /// Records of failed cuts are ignored. When `selectors` is `None`, any record for the
    /// address counts as overlapping.
    pub fn has_recorded_facet(
        &self,
        proxy_name: &str,
        facet_address: Address,
        selectors: Option<&[Selector]>,
    ) -> bool {
        let Some(proxy) = self.proxies.get(proxy_name) else {
            return false;
        };
        proxy
            .cuts
            .iter()
            .filter(|record| record.is_diamond_cut_success != CutStatus::Failed)
            .filter(|record| record.facet_address == facet_address)
            .any(|record| match selectors {
                None => true,
                Some(selectors) => record.selectors.iter().any(|s| selectors.contains(s)),
            })
    }

    fn proxy_mut(&mut self, proxy_name: &str) -> Result<&mut ProxyRecord, DeployError> {
        self.proxies.get_mut(proxy_name).ok_or_else(|| {
            DeployError::precondition(format!("Diamond proxy [{proxy_name}] does not exist"))
        })
    }
}

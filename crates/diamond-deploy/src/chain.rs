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

//! Boundary between the deployers and the chain.

use std::time::Duration;

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, B256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use anyhow::{ensure, Context};
use async_trait::async_trait;
use url::Url;

/// Settled state of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    /// Whether the transaction executed without reverting.
    pub success: bool,
    /// Address of the contract created by the transaction, if any.
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
}

/// The chain operations used by the deployers.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Send a contract creation transaction with the given init code.
    async fn send_deploy(&self, init_code: Bytes) -> anyhow::Result<TxHash>;

    /// Send a call transaction to `to`.
    async fn send_transaction(&self, to: Address, input: Bytes) -> anyhow::Result<TxHash>;

    /// Wait until the transaction has the given number of confirmations.
    async fn wait_for_receipt(&self, tx_hash: TxHash, confirmations: u64)
        -> anyhow::Result<TxOutcome>;

    async fn code_at(&self, address: Address) -> anyhow::Result<Bytes>;

    async fn storage_at(&self, address: Address, slot: B256) -> anyhow::Result<B256>;
}

/// A contract created by a confirmed deployment transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub tx_hash: TxHash,
}

/// Deploy `init_code` and wait for the deployment to be confirmed.
pub async fn deploy_contract(
    chain: &dyn ChainClient,
    init_code: Bytes,
    confirmations: u64,
) -> anyhow::Result<DeployedContract> {
    let tx_hash = chain.send_deploy(init_code).await.context("Sending deployment failed")?;
    tracing::debug!(%tx_hash, "Sent deployment transaction");
    let outcome = chain
        .wait_for_receipt(tx_hash, confirmations)
        .await
        .with_context(|| format!("Failed to receive receipt for deployment {tx_hash}"))?;
    ensure!(outcome.success, "Deployment transaction reverted: tx_hash = {tx_hash}");
    let address = outcome
        .contract_address
        .with_context(|| format!("No contract address in receipt for {tx_hash}"))?;
    Ok(DeployedContract { address, tx_hash })
}

/// [ChainClient] backed by an alloy provider with a signing wallet.
#[derive(Clone)]
pub struct AlloyChainClient {
    provider: DynProvider,
    tx_timeout: Option<Duration>,
}

impl AlloyChainClient {
    pub fn new(provider: DynProvider, tx_timeout: Option<Duration>) -> Self {
        Self { provider, tx_timeout }
    }

    /// Connect to `rpc_url`, signing transactions with `signer`.
    pub fn connect(rpc_url: Url, signer: PrivateKeySigner, tx_timeout: Option<Duration>) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(rpc_url)
            .erased();
        Self::new(provider, tx_timeout)
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub async fn chain_id(&self) -> anyhow::Result<u64> {
        self.provider.get_chain_id().await.context("Failed to query chain ID")
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn send_deploy(&self, init_code: Bytes) -> anyhow::Result<TxHash> {
        let tx = TransactionRequest::default().with_deploy_code(init_code);
        let pending = self.provider.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn send_transaction(&self, to: Address, input: Bytes) -> anyhow::Result<TxHash> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        let pending = self.provider.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> anyhow::Result<TxOutcome> {
        tracing::debug!(timeout = ?self.tx_timeout, %tx_hash, confirmations, "Waiting for transaction receipt");
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(confirmations)
            .with_timeout(self.tx_timeout)
            .get_receipt()
            .await
            .with_context(|| format!("Failed to receive receipt for {tx_hash}"))?;
        Ok(TxOutcome {
            tx_hash,
            success: receipt.status(),
            contract_address: receipt.contract_address,
            block_number: receipt.block_number,
        })
    }

    async fn code_at(&self, address: Address) -> anyhow::Result<Bytes> {
        self.provider
            .get_code_at(address)
            .await
            .with_context(|| format!("Failed to get code at {address}"))
    }

    async fn storage_at(&self, address: Address, slot: B256) -> anyhow::Result<B256> {
        let value = self
            .provider
            .get_storage_at(address, slot.into())
            .await
            .with_context(|| format!("Failed to read storage slot {slot} of {address}"))?;
        Ok(B256::from(value.to_be_bytes::<32>()))
    }
}

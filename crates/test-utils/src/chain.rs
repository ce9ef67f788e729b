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

//! An in-memory [ChainClient].

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::Mutex,
};

use alloy::{
    primitives::{keccak256, Address, Bytes, TxHash, B256, U256},
    sol_types::SolCall,
};
use anyhow::{bail, Context};
use async_trait::async_trait;
use diamond_deploy::{
    chain::{ChainClient, TxOutcome},
    contracts::{
        IDiamondWritable::diamondCutCall, IUUPSUpgradeable::upgradeToAndCallCall,
        ERC1967_IMPLEMENTATION_SLOT,
    },
};

/// Runtime code given to every contract created on the mock chain.
const DEPLOYED_CODE: [u8; 2] = [0x60, 0x00];

/// A transaction sent with [ChainClient::send_transaction].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransaction {
    pub tx_hash: TxHash,
    pub to: Address,
    pub input: Bytes,
}

#[derive(Default)]
struct State {
    nonce: u64,
    block_number: u64,
    deployments: Vec<(Address, Bytes)>,
    transactions: Vec<SentTransaction>,
    receipts: HashMap<TxHash, TxOutcome>,
    code: HashMap<Address, Bytes>,
    storage: HashMap<(Address, B256), B256>,
    confirmations: Vec<u64>,
    snapshots: Vec<Option<String>>,
}

/// In-memory chain that executes just enough to drive the deployers.
///
/// Contract creation assigns sequential addresses. Proxy deployments and `upgradeToAndCall`
/// transactions update the ERC-1967 implementation slot, so reading it back works as on a real
/// chain. Failures can be injected per creation bytecode and for call transactions.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<State>,
    proxy_bytecode: Option<Bytes>,
    failing_deploys: HashSet<Bytes>,
    revert_calls: bool,
    reject_calls: bool,
    lose_receipts: bool,
    watched_file: Option<PathBuf>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat deployments of `bytecode` as ERC-1967 proxies.
    pub fn with_proxy_bytecode(self, bytecode: Bytes) -> Self {
        Self { proxy_bytecode: Some(bytecode), ..self }
    }

    /// Revert every deployment whose init code starts with `bytecode`.
    pub fn failing_deploy(mut self, bytecode: Bytes) -> Self {
        self.failing_deploys.insert(bytecode);
        self
    }

    /// Revert every call transaction.
    pub fn reverting_calls(self) -> Self {
        Self { revert_calls: true, ..self }
    }

    /// Refuse to send call transactions.
    pub fn rejecting_calls(self) -> Self {
        Self { reject_calls: true, ..self }
    }

    /// Time out while waiting for receipts of call transactions.
    pub fn losing_receipts(self) -> Self {
        Self { lose_receipts: true, ..self }
    }

    /// Read `path` every time a call transaction is sent, before it executes.
    pub fn snapshot_on_send(self, path: impl Into<PathBuf>) -> Self {
        Self { watched_file: Some(path.into()), ..self }
    }

    /// Contents of the watched file at each call transaction. `None` when it did not exist.
    pub fn snapshots(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().snapshots.clone()
    }

    /// Address the n-th contract creation on this chain gets, counting from zero.
    pub fn address_of_deployment(n: u64) -> Address {
        Address::from_word(B256::from(U256::from(0x1000 + n)))
    }

    /// Place code at `address`, as for a contract deployed outside the test.
    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state.lock().unwrap().code.insert(address, code);
    }

    /// Init code of every contract creation, in order.
    pub fn deployments(&self) -> Vec<(Address, Bytes)> {
        self.state.lock().unwrap().deployments.clone()
    }

    pub fn deploy_count(&self) -> usize {
        self.state.lock().unwrap().deployments.len()
    }

    pub fn transactions(&self) -> Vec<SentTransaction> {
        self.state.lock().unwrap().transactions.clone()
    }

    /// Decoded `diamondCut` calls, in order.
    pub fn diamond_cuts(&self) -> Vec<diamondCutCall> {
        self.transactions()
            .iter()
            .filter_map(|tx| diamondCutCall::abi_decode(&tx.input).ok())
            .collect()
    }

    /// Number of transactions of any kind sent so far.
    pub fn sent_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.deployments.len() + state.transactions.len()
    }

    /// Confirmation counts requested from [ChainClient::wait_for_receipt].
    pub fn requested_confirmations(&self) -> Vec<u64> {
        self.state.lock().unwrap().confirmations.clone()
    }

    pub fn implementation_of(&self, proxy: Address) -> Option<Address> {
        let state = self.state.lock().unwrap();
        state
            .storage
            .get(&(proxy, ERC1967_IMPLEMENTATION_SLOT))
            .map(|word| Address::from_word(*word))
    }

    fn next_tx_hash(state: &mut State) -> TxHash {
        state.nonce += 1;
        keccak256(state.nonce.to_be_bytes())
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn send_deploy(&self, init_code: Bytes) -> anyhow::Result<TxHash> {
        let mut state = self.state.lock().unwrap();
        let tx_hash = Self::next_tx_hash(&mut state);
        state.block_number += 1;

        let failing = self.failing_deploys.iter().any(|code| init_code.starts_with(code));
        if failing {
            tracing::debug!(%tx_hash, "Mock deployment reverted");
            let outcome = TxOutcome {
                tx_hash,
                success: false,
                contract_address: None,
                block_number: Some(state.block_number),
            };
            state.receipts.insert(tx_hash, outcome);
            return Ok(tx_hash);
        }

        let address = Self::address_of_deployment(state.deployments.len() as u64);
        if let Some(proxy_code) = &self.proxy_bytecode {
            if let Some(args) = init_code.strip_prefix(&proxy_code[..]) {
                // First constructor argument is the implementation address.
                let word = args.get(..32).context("Proxy deployed without constructor arguments")?;
                state.storage.insert((address, ERC1967_IMPLEMENTATION_SLOT), B256::from_slice(word));
            }
        }
        state.code.insert(address, Bytes::from_static(&DEPLOYED_CODE));
        state.deployments.push((address, init_code));
        let outcome = TxOutcome {
            tx_hash,
            success: true,
            contract_address: Some(address),
            block_number: Some(state.block_number),
        };
        state.receipts.insert(tx_hash, outcome);
        Ok(tx_hash)
    }

    async fn send_transaction(&self, to: Address, input: Bytes) -> anyhow::Result<TxHash> {
        if self.reject_calls {
            bail!("server returned an error response: insufficient funds for gas");
        }
        let mut state = self.state.lock().unwrap();
        if let Some(path) = &self.watched_file {
            let snapshot = std::fs::read_to_string(path).ok();
            state.snapshots.push(snapshot);
        }
        let tx_hash = Self::next_tx_hash(&mut state);
        state.block_number += 1;
        state.transactions.push(SentTransaction { tx_hash, to, input: input.clone() });

        let success = !self.revert_calls;
        if success {
            if let Ok(call) = upgradeToAndCallCall::abi_decode(&input) {
                state
                    .storage
                    .insert((to, ERC1967_IMPLEMENTATION_SLOT), call.newImplementation.into_word());
            }
        }
        let outcome = TxOutcome {
            tx_hash,
            success,
            contract_address: None,
            block_number: Some(state.block_number),
        };
        state.receipts.insert(tx_hash, outcome);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> anyhow::Result<TxOutcome> {
        let mut state = self.state.lock().unwrap();
        state.confirmations.push(confirmations);
        let outcome = *state.receipts.get(&tx_hash).context("Unknown transaction")?;
        if self.lose_receipts && outcome.contract_address.is_none() && outcome.success {
            bail!("Timed out waiting for receipt of {tx_hash}");
        }
        Ok(outcome)
    }

    async fn code_at(&self, address: Address) -> anyhow::Result<Bytes> {
        Ok(self.state.lock().unwrap().code.get(&address).cloned().unwrap_or_default())
    }

    async fn storage_at(&self, address: Address, slot: B256) -> anyhow::Result<B256> {
        Ok(self.state.lock().unwrap().storage.get(&(address, slot)).copied().unwrap_or_default())
    }
}

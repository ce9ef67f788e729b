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

//! Test utilities for diamond-deploy.
//!
//! This crate provides an in-memory chain, a recording source verifier and a registry of
//! fixture contracts, so the deployers can be tested without a node.

pub mod chain;
pub mod fixtures;
pub mod verifier;

pub use chain::MockChain;
pub use verifier::MockVerifier;

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::EngineError;
use crate::engine::world::World;
use alloy::primitives::{Address, Bytes, U256};

/// Outcome of one sub-call in `try_multicall`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallResult {
    pub success: bool,
    pub return_data: Bytes,
    pub error: Option<EngineError>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Batcher;

impl Batcher {
    /// Run every payload against `target` in order, all or nothing.
    /// Each sub-call keeps `caller` as its sender.
    pub fn multicall<I, P>(
        world: &mut World,
        caller: Address,
        target: Address,
        payloads: I,
    ) -> Result<Vec<Bytes>, EngineError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Bytes>,
    {
        world.atomic(|world| {
            let mut results = Vec::new();
            for (index, payload) in payloads.into_iter().enumerate() {
                let out = world
                    .invoke(caller, target, payload, U256::ZERO)
                    .inspect_err(|err| {
                        tracing::debug!(
                            target: "multicall",
                            callee = %target,
                            index,
                            error = %err,
                            "Sub-call failed, aborting batch"
                        );
                    })?;
                results.push(out);
            }
            tracing::debug!(
                target: "multicall",
                %caller,
                callee = %target,
                calls = results.len(),
                "Batch executed"
            );
            Ok(results)
        })
    }

    /// Multicall3 `tryAggregate`: failures are collected instead of aborting,
    /// unless `require_success` is set.
    pub fn try_multicall<I, P>(
        world: &mut World,
        caller: Address,
        target: Address,
        payloads: I,
        require_success: bool,
    ) -> Result<Vec<CallResult>, EngineError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Bytes>,
    {
        if require_success {
            return Self::multicall(world, caller, target, payloads).map(|outs| {
                outs.into_iter()
                    .map(|return_data| CallResult {
                        success: true,
                        return_data,
                        error: None,
                    })
                    .collect()
            });
        }

        world.atomic(|world| {
            let results: Vec<CallResult> = payloads
                .into_iter()
                .map(|payload| match world.invoke(caller, target, payload, U256::ZERO) {
                    Ok(return_data) => CallResult {
                        success: true,
                        return_data,
                        error: None,
                    },
                    Err(err) => CallResult {
                        success: false,
                        return_data: Bytes::new(),
                        error: Some(err),
                    },
                })
                .collect();
            let failed = results.iter().filter(|r| !r.success).count();
            tracing::debug!(
                target: "multicall",
                %caller,
                callee = %target,
                calls = results.len(),
                failed,
                "Try-batch executed"
            );
            Ok(results)
        })
    }
}

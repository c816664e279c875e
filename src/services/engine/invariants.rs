// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::EngineError;
use crate::engine::flash_loan::FlashLoanSession;
use crate::engine::world::World;
use std::sync::Arc;

/// Checks a pool runs around a flash loan. `pre_loan` sees the world before
/// any funds move; `post_callback` sees it after the borrower returned.
pub trait LoanInvariant: Send + Sync {
    fn pre_loan(&self, _world: &World, _session: &FlashLoanSession) -> Result<(), EngineError> {
        Ok(())
    }

    fn post_callback(&self, world: &World, session: &FlashLoanSession) -> Result<(), EngineError>;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Pool balance must end at `balance_before + fee`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceDelta;

impl LoanInvariant for BalanceDelta {
    fn post_callback(&self, world: &World, session: &FlashLoanSession) -> Result<(), EngineError> {
        let required = session.required_balance()?;
        let actual = world.balance_of(session.pool, session.asset);
        if actual < required {
            return Err(EngineError::RepaymentNotMet {
                pool: session.pool,
                asset: session.asset,
                required,
                actual,
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "balance-delta"
    }
}

type Hook = Box<dyn Fn(&World, &FlashLoanSession) -> Result<(), EngineError> + Send + Sync>;

/// Closure-defined invariant for pools whose accounting deviates from the
/// plain balance check (share/asset comparisons and the like).
pub struct CustomInvariant {
    name: String,
    pre_loan: Option<Hook>,
    post_callback: Option<Hook>,
}

impl CustomInvariant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pre_loan: None,
            post_callback: None,
        }
    }

    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&World, &FlashLoanSession) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        self.pre_loan = Some(Box::new(hook));
        self
    }

    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&World, &FlashLoanSession) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        self.post_callback = Some(Box::new(hook));
        self
    }
}

impl LoanInvariant for CustomInvariant {
    fn pre_loan(&self, world: &World, session: &FlashLoanSession) -> Result<(), EngineError> {
        match &self.pre_loan {
            Some(hook) => hook(world, session),
            None => Ok(()),
        }
    }

    fn post_callback(&self, world: &World, session: &FlashLoanSession) -> Result<(), EngineError> {
        match &self.post_callback {
            Some(hook) => hook(world, session),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Runs every member in order; the first failure wins.
#[derive(Default, Clone)]
pub struct AllOf(Vec<Arc<dyn LoanInvariant>>);

impl AllOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, invariant: impl LoanInvariant + 'static) -> Self {
        self.0.push(Arc::new(invariant));
        self
    }
}

impl LoanInvariant for AllOf {
    fn pre_loan(&self, world: &World, session: &FlashLoanSession) -> Result<(), EngineError> {
        self.0.iter().try_for_each(|inv| inv.pre_loan(world, session))
    }

    fn post_callback(&self, world: &World, session: &FlashLoanSession) -> Result<(), EngineError> {
        self.0
            .iter()
            .try_for_each(|inv| inv.post_callback(world, session))
    }

    fn name(&self) -> &str {
        "all-of"
    }
}

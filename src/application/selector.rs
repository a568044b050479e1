use crate::domain::ports::{PaymentStrategy, PaymentStrategyBox};
use crate::error::{Result, SettlementError};
use std::collections::HashMap;

/// Maps provider names to the rail strategy that handles them.
///
/// Populated once at startup. Adding a rail means registering another boxed
/// strategy; callers only ever see `resolve`.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, PaymentStrategyBox>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: impl Into<String>, strategy: PaymentStrategyBox) -> Self {
        self.strategies.insert(provider.into(), strategy);
        self
    }

    /// Looks up the strategy for `provider`, failing with `UnsupportedProvider`.
    pub fn resolve(&self, provider: &str) -> Result<&dyn PaymentStrategy> {
        self.strategies
            .get(provider)
            .map(|strategy| strategy.as_ref())
            .ok_or_else(|| SettlementError::UnsupportedProvider(provider.to_string()))
    }

    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

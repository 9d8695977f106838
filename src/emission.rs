//! Decaying per-block reward emission

use crate::error::{Result, VaultError};
use crate::math;

/// Reward rate with a counted multiplicative step-down.
///
/// Each call to [`EmissionSchedule::update`] applies at most one decay step,
/// no matter how many intervals have elapsed. Catching up requires repeated
/// calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmissionSchedule {
    /// Current reward emitted per block
    pub reward_per_block: u128,
    /// Block at which the last decay step was booked
    pub last_decay_block: u64,
    /// Blocks between two decay steps
    pub decay_interval: u64,
    /// Multiplier scaled by 1e12 (985e9 == 0.985)
    pub coefficient: u128,
    /// Number of decay steps applied so far
    pub decays_applied: u32,
    /// Cap on decay steps; `None` means unlimited
    pub max_decays: Option<u32>,
}

impl EmissionSchedule {
    pub fn new(
        reward_per_block: u128,
        start_block: u64,
        decay_interval: u64,
        coefficient: u128,
        max_decays: Option<u32>,
    ) -> Self {
        Self {
            reward_per_block,
            last_decay_block: start_block,
            decay_interval,
            coefficient,
            decays_applied: 0,
            max_decays,
        }
    }

    fn cap_reached(&self) -> bool {
        matches!(self.max_decays, Some(cap) if self.decays_applied >= cap)
    }

    /// Whether a call to `update(now_block)` would change the rate.
    pub fn is_due(&self, now_block: u64) -> bool {
        if self.cap_reached() || self.decay_interval == 0 {
            return false;
        }
        match self.last_decay_block.checked_add(self.decay_interval) {
            Some(next) => now_block >= next,
            None => false,
        }
    }

    /// Apply a single decay step if one is due.
    ///
    /// # Returns
    /// * `Ok(true)` if the rate changed
    /// * `Ok(false)` if too few blocks elapsed or the cap is reached
    pub fn update(&mut self, now_block: u64) -> Result<bool> {
        if !self.is_due(now_block) {
            return Ok(false);
        }
        let next_rate = math::decay(self.reward_per_block, self.coefficient).ok_or(VaultError::Overflow)?;
        self.reward_per_block = next_rate;
        // is_due already proved this addition fits
        self.last_decay_block += self.decay_interval;
        self.decays_applied += 1;
        log::debug!(
            "emission decayed to {} per block (step {}, anchor block {})",
            self.reward_per_block,
            self.decays_applied,
            self.last_decay_block
        );
        Ok(true)
    }

    /// Owner override. Decay bookkeeping is left as is.
    pub fn set_reward_per_block(&mut self, reward_per_block: u128) {
        self.reward_per_block = reward_per_block;
    }
}

//! Guaranteed withdrawal base tracking.
//!
//! The tracker evolves (AV, GWB) one contract year at a time. The step order
//! is contractual and must not be rearranged: fee, return, rollup, ratchet,
//! withdrawal, advance.

use serde::{Deserialize, Serialize};

use annuity_core::{FeeBasis, GwbConfig, PricingError, RollupType};

/// Per-path contract state. Owned by exactly one path; never shared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GwbState {
    /// Account value. Once it reaches zero it stays at zero.
    pub av: f64,
    /// Guaranteed withdrawal base.
    pub gwb: f64,
    pub years_in_force: u32,
    pub total_withdrawn: f64,
    /// True until the first withdrawal ends the rollup phase.
    pub in_rollup_period: bool,
}

/// Outcome of a single annual step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub new_state: GwbState,
    pub withdrawal_taken: f64,
    pub fees_charged: f64,
    pub was_ratcheted: bool,
}

/// GWB state machine for one contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GwbTracker {
    config: GwbConfig,
    premium: f64,
}

impl GwbTracker {
    pub fn new(config: GwbConfig, premium: f64) -> Result<Self, PricingError> {
        config.validate()?;
        if premium <= 0.0 {
            return Err(PricingError::precondition("premium must be > 0", premium));
        }
        Ok(GwbTracker { config, premium })
    }

    pub fn config(&self) -> &GwbConfig {
        &self.config
    }

    pub fn initial_state(&self) -> GwbState {
        GwbState {
            av: self.premium,
            gwb: self.premium,
            years_in_force: 0,
            total_withdrawn: 0.0,
            in_rollup_period: self.config.rollup_type != RollupType::None,
        }
    }

    /// Maximum guaranteed withdrawal for the year: GWB x contract rate,
    /// regardless of the account value.
    pub fn max_withdrawal(&self, state: &GwbState) -> f64 {
        state.gwb * self.config.withdrawal_rate
    }

    /// Advance the contract one period. `av_return` is the simple return
    /// applied to the account value; `withdrawal` is the amount actually
    /// taken (at or below the guaranteed maximum, so the base is untouched).
    pub fn step(
        &self,
        state: GwbState,
        av_return: f64,
        dt: f64,
        withdrawal: f64,
    ) -> Result<StepResult, PricingError> {
        if withdrawal < 0.0 {
            return Err(PricingError::precondition(
                "withdrawal must be >= 0",
                withdrawal,
            ));
        }
        if dt <= 0.0 {
            return Err(PricingError::precondition("step size must be > 0", dt));
        }

        let c = &self.config;
        let mut next = state;
        let mut was_ratcheted = false;

        // 1. Fee accrual on the configured basis.
        let fee_basis_value = match c.fee_basis {
            FeeBasis::AccountValue => next.av,
            FeeBasis::GuaranteedBase => next.gwb,
        };
        let fees_charged = fee_basis_value * c.fee_rate * dt;
        next.av = (next.av - fees_charged).max(0.0);

        // 2. Market return on the account value.
        next.av *= 1.0 + av_return;
        next.av = next.av.max(0.0);

        // 3. Rollup, while the deferral window is open.
        if next.in_rollup_period && next.years_in_force < c.rollup_cap_years {
            match c.rollup_type {
                RollupType::Compound => next.gwb *= 1.0 + c.rollup_rate * dt,
                RollupType::Simple => next.gwb += self.premium * c.rollup_rate * dt,
                RollupType::None => {}
            }
        }

        // 4. Ratchet the base up to the account value.
        if c.ratchet_enabled && next.years_in_force % c.ratchet_frequency == 0 && next.av > next.gwb
        {
            next.gwb = next.av;
            was_ratcheted = true;
        }

        // 5. Withdrawal. Guaranteed withdrawals never reduce the base.
        next.av = (next.av - withdrawal).max(0.0);
        next.total_withdrawn += withdrawal;
        if withdrawal > 0.0 {
            next.in_rollup_period = false;
        }

        // 6. Advance the clock.
        next.years_in_force += 1;

        Ok(StepResult {
            new_state: next,
            withdrawal_taken: withdrawal,
            fees_charged,
            was_ratcheted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GwbConfig {
        GwbConfig {
            rollup_type: RollupType::Compound,
            rollup_rate: 0.05,
            rollup_cap_years: 10,
            ratchet_enabled: false,
            ratchet_frequency: 1,
            withdrawal_rate: 0.05,
            fee_rate: 0.0,
            fee_basis: FeeBasis::AccountValue,
        }
    }

    #[test]
    fn compound_rollup_grows_the_base_each_year() {
        let tracker = GwbTracker::new(config(), 100_000.0).unwrap();
        let mut state = tracker.initial_state();
        for year in 0..10 {
            let before = state.gwb;
            let result = tracker.step(state, 0.0, 1.0, 0.0).unwrap();
            state = result.new_state;
            assert!(
                state.gwb >= before * 1.05 - 1e-9,
                "rollup shortfall in year {year}"
            );
        }
        assert!((state.gwb - 100_000.0 * 1.05_f64.powi(10)).abs() < 1e-6);
    }

    #[test]
    fn rollup_stops_at_the_cap_year() {
        let tracker = GwbTracker::new(config(), 100_000.0).unwrap();
        let mut state = tracker.initial_state();
        for _ in 0..15 {
            state = tracker.step(state, 0.0, 1.0, 0.0).unwrap().new_state;
        }
        // Only the first 10 years roll up.
        assert!((state.gwb - 100_000.0 * 1.05_f64.powi(10)).abs() < 1e-6);
    }

    #[test]
    fn simple_rollup_adds_on_premium() {
        let mut c = config();
        c.rollup_type = RollupType::Simple;
        let tracker = GwbTracker::new(c, 100_000.0).unwrap();
        let mut state = tracker.initial_state();
        for _ in 0..3 {
            state = tracker.step(state, 0.0, 1.0, 0.0).unwrap().new_state;
        }
        assert!((state.gwb - 115_000.0).abs() < 1e-9);
    }

    #[test]
    fn withdrawal_ends_the_rollup_phase() {
        let tracker = GwbTracker::new(config(), 100_000.0).unwrap();
        let state = tracker.initial_state();
        let result = tracker.step(state, 0.0, 1.0, 1_000.0).unwrap();
        assert!(!result.new_state.in_rollup_period);
        let gwb_after_first = result.new_state.gwb;
        // No further rollup in later years.
        let later = tracker.step(result.new_state, 0.0, 1.0, 0.0).unwrap();
        assert!((later.new_state.gwb - gwb_after_first).abs() < 1e-12);
    }

    #[test]
    fn ratchet_steps_up_to_account_value() {
        let mut c = config();
        c.rollup_type = RollupType::None;
        c.ratchet_enabled = true;
        c.ratchet_frequency = 1;
        let tracker = GwbTracker::new(c, 100_000.0).unwrap();
        let state = tracker.initial_state();
        let result = tracker.step(state, 0.30, 1.0, 0.0).unwrap();
        assert!(result.was_ratcheted);
        assert!((result.new_state.gwb - 130_000.0).abs() < 1e-6);
        // A down year never drags the base back.
        let down = tracker.step(result.new_state, -0.40, 1.0, 0.0).unwrap();
        assert!(!down.was_ratcheted);
        assert!((down.new_state.gwb - 130_000.0).abs() < 1e-6);
    }

    #[test]
    fn ratchet_respects_frequency() {
        let mut c = config();
        c.rollup_type = RollupType::None;
        c.ratchet_enabled = true;
        c.ratchet_frequency = 3;
        let tracker = GwbTracker::new(c, 100_000.0).unwrap();
        let mut state = tracker.initial_state();
        // Year 0 ratchets (0 mod 3 == 0), years 1 and 2 do not.
        state = tracker.step(state, 0.10, 1.0, 0.0).unwrap().new_state;
        assert!((state.gwb - 110_000.0).abs() < 1e-6);
        let r1 = tracker.step(state, 0.10, 1.0, 0.0).unwrap();
        assert!(!r1.was_ratcheted);
        let r2 = tracker.step(r1.new_state, 0.10, 1.0, 0.0).unwrap();
        assert!(!r2.was_ratcheted);
        let r3 = tracker.step(r2.new_state, 0.10, 1.0, 0.0).unwrap();
        assert!(r3.was_ratcheted);
    }

    #[test]
    fn account_value_is_absorbing_at_zero() {
        let mut c = config();
        c.fee_rate = 0.01;
        c.fee_basis = FeeBasis::GuaranteedBase;
        let tracker = GwbTracker::new(c, 100_000.0).unwrap();
        let mut state = tracker.initial_state();
        // Drain the account with a catastrophic return and a big withdrawal.
        state = tracker.step(state, -0.99, 1.0, 5_000.0).unwrap().new_state;
        state = tracker.step(state, 0.50, 1.0, 5_000.0).unwrap().new_state;
        assert_eq!(state.av, 0.0);
        // Positive returns cannot resurrect a depleted account.
        let revived = tracker.step(state, 10.0, 1.0, 0.0).unwrap();
        assert_eq!(revived.new_state.av, 0.0);
    }

    #[test]
    fn fee_accrues_on_the_configured_basis() {
        let mut c = config();
        c.rollup_type = RollupType::None;
        c.fee_rate = 0.01;
        let tracker = GwbTracker::new(c, 100_000.0).unwrap();
        let result = tracker.step(tracker.initial_state(), 0.0, 1.0, 0.0).unwrap();
        assert!((result.fees_charged - 1_000.0).abs() < 1e-9);
        assert!((result.new_state.av - 99_000.0).abs() < 1e-9);

        c.fee_basis = FeeBasis::GuaranteedBase;
        let tracker = GwbTracker::new(c, 100_000.0).unwrap();
        let mut state = tracker.initial_state();
        state.av = 50_000.0;
        let result = tracker.step(state, 0.0, 1.0, 0.0).unwrap();
        // Fee still computed on the 100k base.
        assert!((result.fees_charged - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn max_withdrawal_ignores_account_value() {
        let tracker = GwbTracker::new(config(), 100_000.0).unwrap();
        let mut state = tracker.initial_state();
        state.av = 0.0;
        assert!((tracker.max_withdrawal(&state) - 5_000.0).abs() < 1e-9);
    }

    #[test]
    fn negative_withdrawal_rejected() {
        let tracker = GwbTracker::new(config(), 100_000.0).unwrap();
        assert!(tracker
            .step(tracker.initial_state(), 0.0, 1.0, -1.0)
            .is_err());
    }
}

//! HALT/WARN/PASS validation gates over pricing results.
//!
//! Every numerical output passes through the gate set before release. A HALT
//! is never raised implicitly: `validate` always returns the full report, and
//! callers that want failure-on-halt use `ensure_valid`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use annuity_core::{FiaResult, GlwbResult, PricingError, PricingResult, RilaResult};

/// Status of a single gate, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Pass,
    Warn,
    Halt,
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateResult {
    pub status: GateStatus,
    pub gate_name: &'static str,
    pub message: String,
    pub value: Option<f64>,
    pub threshold: Option<f64>,
}

impl GateResult {
    fn pass(gate_name: &'static str) -> Self {
        GateResult {
            status: GateStatus::Pass,
            gate_name,
            message: "ok".to_string(),
            value: None,
            threshold: None,
        }
    }

    fn warn(gate_name: &'static str, message: String, value: f64, threshold: f64) -> Self {
        GateResult {
            status: GateStatus::Warn,
            gate_name,
            message,
            value: Some(value),
            threshold: Some(threshold),
        }
    }

    fn halt(gate_name: &'static str, message: String, value: f64, threshold: f64) -> Self {
        GateResult {
            status: GateStatus::Halt,
            gate_name,
            message,
            value: Some(value),
            threshold: Some(threshold),
        }
    }

    /// A gate counts as passed unless it halted.
    pub fn passed(&self) -> bool {
        self.status != GateStatus::Halt
    }
}

/// Complete report from one validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub results: Vec<GateResult>,
}

impl ValidationReport {
    /// Worst status across all gates.
    pub fn overall_status(&self) -> GateStatus {
        self.results
            .iter()
            .map(|r| r.status)
            .max()
            .unwrap_or(GateStatus::Pass)
    }

    pub fn passed(&self) -> bool {
        self.overall_status() != GateStatus::Halt
    }

    pub fn halted_gates(&self) -> Vec<&GateResult> {
        self.results
            .iter()
            .filter(|r| r.status == GateStatus::Halt)
            .collect()
    }

    pub fn warned_gates(&self) -> Vec<&GateResult> {
        self.results
            .iter()
            .filter(|r| r.status == GateStatus::Warn)
            .collect()
    }
}

/// Context the gates need beyond the result itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationContext {
    pub premium: f64,
    /// Contract cap rate, when the product has one (expected-credit gate).
    pub cap_rate: Option<f64>,
}

impl ValidationContext {
    pub fn new(premium: f64) -> Self {
        ValidationContext {
            premium,
            cap_rate: None,
        }
    }

    pub fn with_cap(mut self, cap_rate: f64) -> Self {
        self.cap_rate = Some(cap_rate);
        self
    }
}

/// Run the standard gate set for a pricing result.
pub fn validate(result: &PricingResult, context: &ValidationContext) -> ValidationReport {
    let mut results = Vec::new();

    if let Some(pv) = result.present_value() {
        results.push(pv_bounds_gate(pv, context.premium));
    }
    if let Some(duration) = result.duration() {
        results.push(duration_gate(duration));
    }

    match result {
        PricingResult::Fia(fia) => fia_gates(fia, context, &mut results),
        PricingResult::Rila(rila) => rila_gates(rila, context, &mut results),
        PricingResult::Glwb(glwb) => glwb_gates(glwb, &mut results),
        PricingResult::Myga(_) | PricingResult::Reserve(_) => {}
    }

    let report = ValidationReport { results };
    for gate in report.results.iter().filter(|r| r.status != GateStatus::Pass) {
        warn!(
            gate = gate.gate_name,
            status = ?gate.status,
            value = gate.value,
            threshold = gate.threshold,
            "{}",
            gate.message
        );
    }
    report
}

/// Validate and fail on HALT. The engine never silently returns a failing
/// result; this is the variant for callers who want that enforced.
pub fn ensure_valid(
    result: PricingResult,
    context: &ValidationContext,
) -> Result<(PricingResult, ValidationReport), PricingError> {
    let report = validate(&result, context);
    if let Some(halted) = report.halted_gates().first() {
        return Err(PricingError::ValidationHalt {
            gate: halted.gate_name.to_string(),
            message: halted.message.clone(),
        });
    }
    Ok((result, report))
}

fn pv_bounds_gate(pv: f64, premium: f64) -> GateResult {
    let upper = 10.0 * premium;
    if pv < 0.0 {
        GateResult::halt(
            "pv_bounds",
            format!("present value {pv:.4} is negative"),
            pv,
            0.0,
        )
    } else if pv > upper {
        GateResult::halt(
            "pv_bounds",
            format!("present value {pv:.4} exceeds 10x premium"),
            pv,
            upper,
        )
    } else {
        GateResult::pass("pv_bounds")
    }
}

fn duration_gate(duration: f64) -> GateResult {
    if !(0.0..=30.0).contains(&duration) {
        GateResult::halt(
            "duration_bounds",
            format!("duration {duration:.2} outside [0, 30] years"),
            duration,
            30.0,
        )
    } else {
        GateResult::pass("duration_bounds")
    }
}

fn fia_gates(fia: &FiaResult, context: &ValidationContext, results: &mut Vec<GateResult>) {
    // Option budget: HALT above 1.5x, WARN when the budget is already spent.
    let budget_limit = 1.5 * fia.option_budget;
    results.push(if fia.embedded_option_value > budget_limit {
        GateResult::halt(
            "fia_option_budget",
            format!(
                "embedded option {:.4} exceeds 1.5x budget {:.4}",
                fia.embedded_option_value, fia.option_budget
            ),
            fia.embedded_option_value,
            budget_limit,
        )
    } else if fia.embedded_option_value > fia.option_budget {
        GateResult::warn(
            "fia_option_budget",
            format!(
                "embedded option {:.4} is above budget {:.4}",
                fia.embedded_option_value, fia.option_budget
            ),
            fia.embedded_option_value,
            fia.option_budget,
        )
    } else {
        GateResult::pass("fia_option_budget")
    });

    // Expected credit: the 0% floor permits only numerical noise below zero,
    // and a capped product cannot out-credit its cap by more than 2%.
    let credit_halted = fia.expected_credit < -1e-3
        || context
            .cap_rate
            .is_some_and(|cap| fia.expected_credit > cap + 0.02);
    results.push(if credit_halted {
        GateResult::halt(
            "fia_expected_credit",
            format!(
                "expected credit {:.6} violates the floor or the cap",
                fia.expected_credit
            ),
            fia.expected_credit,
            context.cap_rate.map(|c| c + 0.02).unwrap_or(-1e-3),
        )
    } else {
        GateResult::pass("fia_expected_credit")
    });

    // Arbitrage: an embedded option worth more than the premium is free money.
    results.push(if fia.embedded_option_value > context.premium {
        GateResult::halt(
            "arbitrage",
            format!(
                "embedded option {:.4} exceeds premium {:.4}",
                fia.embedded_option_value, context.premium
            ),
            fia.embedded_option_value,
            context.premium,
        )
    } else {
        GateResult::pass("arbitrage")
    });
}

fn rila_gates(rila: &RilaResult, context: &ValidationContext, results: &mut Vec<GateResult>) {
    // Max loss must be a probability-like fraction consistent with the
    // protection type.
    let expected_max_loss = rila.protection.max_loss();
    let max_loss_bad = !(0.0..=1.0).contains(&rila.max_loss)
        || (rila.max_loss - expected_max_loss).abs() > 1e-9;
    results.push(if max_loss_bad {
        GateResult::halt(
            "rila_max_loss",
            format!(
                "max loss {:.4} inconsistent with {} protection (expected {:.4})",
                rila.max_loss,
                rila.protection.label(),
                expected_max_loss
            ),
            rila.max_loss,
            expected_max_loss,
        )
    } else {
        GateResult::pass("rila_max_loss")
    });

    // Protection value: negative is impossible; above half the premium is
    // suspicious but not fatal.
    let warn_limit = 0.5 * context.premium;
    results.push(if rila.protection_value < 0.0 {
        GateResult::halt(
            "rila_protection_value",
            format!("protection value {:.4} is negative", rila.protection_value),
            rila.protection_value,
            0.0,
        )
    } else if rila.protection_value > warn_limit {
        GateResult::warn(
            "rila_protection_value",
            format!(
                "protection value {:.4} exceeds 50% of premium",
                rila.protection_value
            ),
            rila.protection_value,
            warn_limit,
        )
    } else {
        GateResult::pass("rila_protection_value")
    });

    // Arbitrage: protection cannot be worth more than the loss it insures.
    let arbitrage_limit = context.premium * rila.max_loss;
    results.push(if rila.protection_value > arbitrage_limit {
        GateResult::halt(
            "arbitrage",
            format!(
                "protection value {:.4} exceeds premium x max loss {:.4}",
                rila.protection_value, arbitrage_limit
            ),
            rila.protection_value,
            arbitrage_limit,
        )
    } else {
        GateResult::pass("arbitrage")
    });
}

fn glwb_gates(glwb: &GlwbResult, results: &mut Vec<GateResult>) {
    results.push(if !(0.0..=1.0).contains(&glwb.prob_ruin) {
        GateResult::halt(
            "glwb_prob_ruin",
            format!("ruin probability {:.4} outside [0, 1]", glwb.prob_ruin),
            glwb.prob_ruin,
            1.0,
        )
    } else {
        GateResult::pass("glwb_prob_ruin")
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use annuity_core::Protection;
    use chrono::NaiveDate;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn fia_result() -> FiaResult {
        FiaResult {
            present_value: 98.0,
            duration: 1.0,
            as_of_date: as_of(),
            embedded_option_value: 2.5,
            option_budget: 3.0,
            fair_cap: Some(0.07),
            fair_participation: Some(0.35),
            expected_credit: 0.035,
        }
    }

    fn rila_result() -> RilaResult {
        RilaResult {
            present_value: 99.0,
            duration: 1.0,
            as_of_date: as_of(),
            protection_value: 3.5,
            protection: Protection::Buffer(0.10),
            upside_value: 3.4,
            expected_return: 0.04,
            max_loss: 0.90,
            breakeven_return: Some(-0.10),
        }
    }

    #[test]
    fn clean_results_pass_every_gate() {
        let context = ValidationContext::new(100.0).with_cap(0.08);
        let report = validate(&PricingResult::Fia(fia_result()), &context);
        assert_eq!(report.overall_status(), GateStatus::Pass);
        assert!(report.passed());

        let report = validate(&PricingResult::Rila(rila_result()), &context);
        assert_eq!(report.overall_status(), GateStatus::Pass);
    }

    #[test]
    fn negative_pv_halts() {
        let mut result = fia_result();
        result.present_value = -5.0;
        let report = validate(
            &PricingResult::Fia(result),
            &ValidationContext::new(100.0),
        );
        assert_eq!(report.overall_status(), GateStatus::Halt);
        assert_eq!(report.halted_gates()[0].gate_name, "pv_bounds");
    }

    #[test]
    fn runaway_pv_halts() {
        let mut result = fia_result();
        result.present_value = 1_001.0;
        let report = validate(
            &PricingResult::Fia(result),
            &ValidationContext::new(100.0),
        );
        assert_eq!(report.overall_status(), GateStatus::Halt);
    }

    #[test]
    fn duration_out_of_bounds_halts() {
        let mut result = fia_result();
        result.duration = 31.0;
        let report = validate(
            &PricingResult::Fia(result),
            &ValidationContext::new(100.0),
        );
        assert!(report
            .halted_gates()
            .iter()
            .any(|g| g.gate_name == "duration_bounds"));
    }

    #[test]
    fn option_budget_warns_then_halts() {
        let context = ValidationContext::new(100.0).with_cap(0.08);
        let mut result = fia_result();
        result.embedded_option_value = 3.5; // above budget, below 1.5x
        let report = validate(&PricingResult::Fia(result), &context);
        assert_eq!(report.overall_status(), GateStatus::Warn);

        let mut result = fia_result();
        result.embedded_option_value = 4.6; // above 1.5x budget
        let report = validate(&PricingResult::Fia(result), &context);
        assert_eq!(report.overall_status(), GateStatus::Halt);
    }

    #[test]
    fn expected_credit_gate_enforces_floor_and_cap() {
        let context = ValidationContext::new(100.0).with_cap(0.08);
        let mut result = fia_result();
        result.expected_credit = -0.01;
        let report = validate(&PricingResult::Fia(result), &context);
        assert!(report
            .halted_gates()
            .iter()
            .any(|g| g.gate_name == "fia_expected_credit"));

        let mut result = fia_result();
        result.expected_credit = 0.11; // cap 8% + 2% headroom exceeded
        let report = validate(&PricingResult::Fia(result), &context);
        assert!(report
            .halted_gates()
            .iter()
            .any(|g| g.gate_name == "fia_expected_credit"));
    }

    #[test]
    fn max_loss_inconsistency_halts() {
        let context = ValidationContext::new(100.0);
        // A buffer of 10% must report a max loss of 90%.
        let mut result = rila_result();
        result.max_loss = 0.10;
        let report = validate(&PricingResult::Rila(result), &context);
        assert!(report
            .halted_gates()
            .iter()
            .any(|g| g.gate_name == "rila_max_loss"));

        let mut result = rila_result();
        result.max_loss = 1.2;
        let report = validate(&PricingResult::Rila(result), &context);
        assert_eq!(report.overall_status(), GateStatus::Halt);
    }

    #[test]
    fn protection_value_warns_high_and_halts_negative() {
        let context = ValidationContext::new(100.0);
        let mut result = rila_result();
        result.protection_value = 55.0;
        let report = validate(&PricingResult::Rila(result), &context);
        assert_eq!(report.overall_status(), GateStatus::Warn);

        let mut result = rila_result();
        result.protection_value = -0.5;
        let report = validate(&PricingResult::Rila(result), &context);
        assert_eq!(report.overall_status(), GateStatus::Halt);
    }

    #[test]
    fn arbitrage_gates_catch_free_money() {
        let context = ValidationContext::new(100.0).with_cap(0.08);
        let mut fia = fia_result();
        fia.embedded_option_value = 120.0;
        fia.option_budget = 100.0;
        let report = validate(&PricingResult::Fia(fia), &context);
        assert!(report
            .halted_gates()
            .iter()
            .any(|g| g.gate_name == "arbitrage"));

        let mut rila = rila_result();
        rila.protection_value = 95.0; // > premium x max_loss = 90
        let report = validate(&PricingResult::Rila(rila), &context);
        assert!(report
            .halted_gates()
            .iter()
            .any(|g| g.gate_name == "arbitrage"));
    }

    #[test]
    fn overall_status_is_the_worst_gate() {
        let context = ValidationContext::new(100.0).with_cap(0.08);
        let mut result = fia_result();
        result.embedded_option_value = 3.5; // WARN
        result.present_value = -1.0; // HALT
        let report = validate(&PricingResult::Fia(result), &context);
        assert_eq!(report.overall_status(), GateStatus::Halt);
        assert_eq!(report.warned_gates().len(), 1);
        assert_eq!(report.halted_gates().len(), 1);
    }

    #[test]
    fn ensure_valid_surfaces_the_halt() {
        let context = ValidationContext::new(100.0);
        let mut result = fia_result();
        result.present_value = -1.0;
        let err = ensure_valid(PricingResult::Fia(result), &context).unwrap_err();
        assert!(matches!(err, PricingError::ValidationHalt { .. }));

        let ok = ensure_valid(PricingResult::Fia(fia_result()), &context);
        assert!(ok.is_ok());
    }
}

//! pricing-cli: batch driver for annuity pricing and statutory reserves.
//!
//! Reads a JSON batch of products plus market parameters, prices each product
//! through the dispatch registry, runs the validation gates, and reports a
//! per-product status without aborting the batch on individual failures.
//!
//! Usage:
//!   cargo run -p pricing-cli -- --products batch.json
//!   cargo run -p pricing-cli -- --products batch.json --seed 42 --paths 100000
//!   cargo run -p pricing-cli -- --products batch.json --reserve --n-scenarios 1000
//!   cargo run -p pricing-cli -- --products batch.json --scenarios-out scenarios.json
//!
//! Exit codes: 0 = all results pass, 1 = any gate HALT, 2 = bad input.

use anyhow::{Context, Result};
use serde::Deserialize;

use annuity_core::{MarketParams, PricingConfig, PricingResult, Product, ProductTerms};
use behavioral_models::{DynamicLapseModel, LapseAssumptions, Mortality, WithdrawalAssumptions, WithdrawalModel};
use product_pricers::ProductRegistry;
use regulatory::{EquityParams, PolicyData, ScenarioGenerator, VasicekParams, Vm21Calculator};
use validation::{validate, GateStatus, ValidationContext};

/// Input batch: shared market environment plus the product list.
#[derive(Debug, Deserialize)]
struct BatchFile {
    market: MarketParams,
    premium: f64,
    #[serde(default)]
    term_years: Option<f64>,
    products: Vec<Product>,
}

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pricing_cli=info,product_pricers=warn".into()),
        )
        .init();

    let code = match run() {
        Ok(any_halt) => {
            if any_halt {
                1
            } else {
                0
            }
        }
        Err(err) => {
            tracing::error!("{err:#}");
            2
        }
    };
    std::process::exit(code);
}

fn run() -> Result<bool> {
    let args: Vec<String> = std::env::args().collect();

    let flag_value = |name: &str| -> Option<&str> {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    };

    let products_path = flag_value("--products").unwrap_or("products.json");
    let seed: Option<u64> = flag_value("--seed").and_then(|v| v.parse().ok());
    let paths: Option<usize> = flag_value("--paths").and_then(|v| v.parse().ok());
    let run_reserve = args.iter().any(|a| a == "--reserve");
    let n_scenarios: usize = flag_value("--n-scenarios")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1_000);
    let projection_years: usize = flag_value("--projection-years")
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let scenarios_out = flag_value("--scenarios-out");

    let raw = std::fs::read_to_string(products_path)
        .with_context(|| format!("cannot read batch file '{products_path}'"))?;
    let batch: BatchFile = serde_json::from_str(&raw)
        .with_context(|| format!("cannot parse batch file '{products_path}'"))?;
    if batch.products.is_empty() {
        anyhow::bail!("batch file '{products_path}' contains no products");
    }

    let mut config = PricingConfig::default();
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(paths) = paths {
        config = config.with_paths(paths);
    }

    let registry = ProductRegistry::new(batch.market, config)
        .context("invalid market environment")?;

    tracing::info!(
        products = batch.products.len(),
        premium = batch.premium,
        seed = config.seed,
        "pricing batch"
    );

    let mut any_halt = false;
    println!("{:<30} {:>10} {:>12} {:<8} {}", "product", "kind", "pv", "status", "detail");
    for product in &batch.products {
        match registry.price(product, batch.premium, batch.term_years) {
            Ok(result) => {
                let context = validation_context(product, batch.premium);
                let report = validate(&result, &context);
                let status = report.overall_status();
                if status == GateStatus::Halt {
                    any_halt = true;
                }
                let detail = report
                    .results
                    .iter()
                    .filter(|g| g.status != GateStatus::Pass)
                    .map(|g| format!("{}: {}", g.gate_name, g.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                println!(
                    "{:<30} {:>10} {:>12.4} {:<8} {}",
                    product.product_name,
                    kind_label(&result),
                    result.present_value().unwrap_or(f64::NAN),
                    status_label(status),
                    detail
                );
            }
            Err(err) => {
                // A per-product failure lands in the error column; the rest
                // of the batch keeps going.
                any_halt = true;
                println!(
                    "{:<30} {:>10} {:>12} {:<8} {}",
                    product.product_name, "-", "-", "ERROR", err
                );
            }
        }
    }

    if run_reserve || scenarios_out.is_some() {
        let generator = ScenarioGenerator::new(n_scenarios, projection_years, config.seed)?;
        let bundle = generator
            .generate(
                batch.market.risk_free_rate,
                &VasicekParams::default(),
                &EquityParams::default(),
                -0.20,
            )?;

        if let Some(path) = scenarios_out {
            let serialized = serde_json::to_string_pretty(&bundle.to_matrices())
                .context("cannot serialize scenario bundle")?;
            std::fs::write(path, serialized)
                .with_context(|| format!("cannot write scenario file '{path}'"))?;
            tracing::info!(path, n_scenarios, projection_years, "scenario bundle written");
        }

        if run_reserve {
            any_halt |= reserve_report(&batch, &bundle)?;
        }
    }

    Ok(any_halt)
}

/// Run the VM-21 CTE reserve for every GLWB product in the batch.
fn reserve_report(batch: &BatchFile, bundle: &regulatory::Ag43Scenarios) -> Result<bool> {
    let mortality = Mortality::Gompertz;
    let lapse = DynamicLapseModel::new(LapseAssumptions::default())?;
    let withdrawal = WithdrawalModel::new(WithdrawalAssumptions::default())?;
    let calculator = Vm21Calculator::cte70();

    let mut any_failure = false;
    for product in &batch.products {
        let ProductTerms::Glwb { rider, age } = &product.terms else {
            continue;
        };
        let policy = PolicyData {
            premium: batch.premium,
            age: *age,
            max_age: 100,
            surrender_years: 7,
            gwb_config: *rider,
        };
        match calculator.reserve(&policy, bundle, &mortality, &lapse, &withdrawal) {
            Ok(result) => {
                println!(
                    "reserve {:<22} cte70={:>12.2} mean={:>12.2} tail={} scenarios",
                    product.product_name,
                    result.cte70,
                    result.mean,
                    result.tail_scenario_ids.len()
                );
            }
            Err(err) => {
                any_failure = true;
                println!("reserve {:<22} ERROR {err}", product.product_name);
            }
        }
    }
    Ok(any_failure)
}

fn validation_context(product: &Product, premium: f64) -> ValidationContext {
    let mut context = ValidationContext::new(premium);
    if let ProductTerms::Fia {
        cap_rate: Some(cap),
        ..
    } = &product.terms
    {
        context = context.with_cap(*cap);
    }
    context
}

fn kind_label(result: &PricingResult) -> &'static str {
    match result {
        PricingResult::Myga(_) => "myga",
        PricingResult::Fia(_) => "fia",
        PricingResult::Rila(_) => "rila",
        PricingResult::Glwb(_) => "glwb",
        PricingResult::Reserve(_) => "reserve",
    }
}

fn status_label(status: GateStatus) -> &'static str {
    match status {
        GateStatus::Pass => "PASS",
        GateStatus::Warn => "WARN",
        GateStatus::Halt => "HALT",
    }
}

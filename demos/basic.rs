use chainfire::{Engine, Facts, FunctionError, Functions, RuleSet, Value};
use tracing_subscriber::EnvFilter;

fn main() {
    // RUST_LOG=chainfire=debug shows each round.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let rules = RuleSet::builder()
        .rule(
            ["account_partner", "account_region"],
            "isEligible",
            r#"account_partner == "hello" && account_region == "ID""#,
        )
        .rule(["account_partner"], "partner_label", "upper(account_partner)")
        .rule(["isEligible", "partner_label"], "result_end", "isEligible")
        .build();
    println!("{rules}");

    let functions = Functions::new().with("upper", |args: &[Value]| match args {
        [Value::String(s)] => Ok(Value::String(s.to_uppercase())),
        _ => Err(FunctionError::new("upper expects one string")),
    });

    let engine = Engine::new();
    engine.set(
        Facts::new()
            .set("account_partner", "hello")
            .set("account_region", "ID"),
        rules,
        functions,
    );

    let report = engine.run_detailed("result_end", 0);
    println!("{report}");
    for (i, round) in report.rounds().iter().enumerate() {
        println!("  round {}: rules {round:?}", i + 1);
    }
    for err in report.outcome().errors() {
        println!("  error: {err}");
    }

    match engine.run("partner_label", 0).value() {
        Some(label) => println!("partner label: {label}"),
        None => println!("partner label was never produced"),
    }
    println!("cache: {}", engine.cache().stats());
    println!("sessions: {}", engine.pool_stats());
}

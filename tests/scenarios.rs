use chainfire::{Engine, EngineError, Facts, FunctionError, Functions, Rule, RuleSet, Value};

fn eligibility_rules() -> RuleSet {
    RuleSet::builder()
        .rule(
            ["account_partner", "account_region"],
            "isEligible",
            r#"account_partner == "hello" && account_region == "ID""#,
        )
        .rule(["isEligible"], "result_end", "isEligible")
        .build()
}

fn set_function() -> Functions {
    Functions::new().with("set", |args: &[Value]| match args {
        [value] => Ok(value.clone()),
        _ => Err(FunctionError::new("lack of arguments")),
    })
}

#[test]
fn eligible_account_reaches_result_end() {
    let engine = Engine::with_workers(2);
    engine.set_facts(
        Facts::new()
            .set("account_partner", "hello")
            .set("account_region", "ID"),
    );
    engine.set_rules(eligibility_rules());

    let (value, errors) = engine.run("result_end", 0).into_parts();
    assert_eq!(value, Some(Value::Bool(true)));
    assert!(errors.is_empty());
}

#[test]
fn missing_fact_leaves_target_absent_without_error() {
    let engine = Engine::with_workers(2);
    engine.set_facts(Facts::new().set("account_partner", "hello"));
    engine.set_rules(eligibility_rules());

    let (value, errors) = engine.run("result_end", 0).into_parts();
    assert_eq!(value, None);
    assert!(errors.is_empty());
}

#[test]
fn invalid_expression_is_a_compile_error() {
    let engine = Engine::with_workers(2);
    engine.set_facts(
        Facts::new()
            .set("account_partner", "hello")
            .set("account_region", "ID"),
    );
    engine.set_rules(vec![
        Rule::new(
            ["account_partner", "account_region"],
            "isEligible",
            r#"account_partner == "hello" && && account_region"#,
        ),
        Rule::new(["isEligible"], "result_end", "isEligible"),
    ]);

    let (value, errors) = engine.run("result_end", 0).into_parts();
    assert_eq!(value, None);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        EngineError::Compile { rule: 0, output, .. } if output == "isEligible"
    ));
}

#[test]
fn extension_function_is_reachable() {
    let engine = Engine::with_workers(2);
    engine.set(
        Facts::new().set("example", "random"),
        vec![Rule::new(["example"], "result_end", "set(example)")],
        set_function(),
    );

    let outcome = engine.run_default();
    assert_eq!(outcome.value(), Some(&Value::from("random")));
    assert!(outcome.is_clean());
}

#[test]
fn extension_function_error_is_reported() {
    let engine = Engine::with_workers(2);
    engine.set(
        Facts::new().set("example", "random"),
        vec![Rule::new(["example"], "result_end", "set()")],
        set_function(),
    );

    let (value, errors) = engine.run_default().into_parts();
    assert_eq!(value, None);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_evaluation());
    assert!(errors[0].to_string().contains("lack of arguments"));
}

#[test]
fn target_can_be_an_intermediate_fact() {
    let engine = Engine::with_workers(2);
    engine.set_facts(
        Facts::new()
            .set("account_partner", "hello")
            .set("account_region", "ID"),
    );
    engine.set_rules(eligibility_rules());

    let outcome = engine.run("isEligible", 0);
    assert_eq!(outcome.value(), Some(&Value::Bool(true)));
    assert!(outcome.is_clean());
}

#[test]
fn ineligible_region_evaluates_to_false() {
    let engine = Engine::with_workers(2);
    engine.set_facts(
        Facts::new()
            .set("account_partner", "hello")
            .set("account_region", "SG"),
    );
    engine.set_rules(eligibility_rules());

    let outcome = engine.run_default();
    assert_eq!(outcome.value(), Some(&Value::Bool(false)));
    assert!(outcome.is_clean());
}

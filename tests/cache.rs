use std::thread;
use std::time::Duration;

use chainfire::{Engine, EngineConfig, ExpressionCache, Facts, Functions, Rule, RuleSet, Value};

#[test]
fn same_text_compiles_once() {
    let cache = ExpressionCache::default();
    let functions = Functions::new();
    let first = cache.get_or_compile("a > 1 && b", &functions).unwrap();
    let second = cache.get_or_compile("a > 1 && b", &functions).unwrap();

    let facts = Facts::new().set("a", 2_i64).set("b", true);
    assert_eq!(first.evaluate(&facts), second.evaluate(&facts));
    assert_eq!(cache.stats().compiles, 1);
}

#[test]
fn rules_sharing_text_share_an_entry() {
    let engine = Engine::with_workers(2);
    engine.set_facts(Facts::new().set("x", 1_i64).set("y", 2_i64));
    engine.set_rules(vec![
        Rule::new(["x"], "x_out", "x + y"),
        Rule::new(["y"], "y_out", "x + y"),
    ]);
    let _ = engine.run("x_out", 0);
    assert_eq!(engine.cache().stats().compiles, 1);
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn repeated_runs_do_not_reparse() {
    let engine = Engine::with_workers(2);
    engine.set_facts(Facts::new().set("a", 3_i64));
    engine.set_rules(
        RuleSet::builder()
            .rule(["a"], "b", "a * a")
            .rule(["b"], "result_end", "b - 1")
            .build(),
    );
    for _ in 0..5 {
        assert_eq!(engine.run_default().value(), Some(&Value::Int(8)));
    }
    let stats = engine.cache().stats();
    assert_eq!(stats.compiles, 2);
    assert_eq!(stats.hits, 8);
}

#[test]
fn set_rules_flushes_the_cache() {
    let engine = Engine::with_workers(1);
    engine.set_facts(Facts::new().set("a", 1_i64));
    engine.set_rules(vec![Rule::new(["a"], "result_end", "a")]);
    let _ = engine.run_default();
    assert_eq!(engine.cache().len(), 1);

    engine.set_rules(vec![Rule::new(["a"], "result_end", "a")]);
    assert!(engine.cache().is_empty());
    let _ = engine.run_default();
    assert_eq!(engine.cache().stats().compiles, 2);
}

#[test]
fn entries_expire_after_ttl() {
    let engine = Engine::with_config(
        EngineConfig::default()
            .with_workers(1)
            .with_cache_ttl(Duration::from_millis(20)),
    );
    engine.set_facts(Facts::new().set("a", 1_i64));
    engine.set_rules(vec![Rule::new(["a"], "result_end", "a")]);
    let _ = engine.run_default();
    thread::sleep(Duration::from_millis(60));
    let _ = engine.run_default();

    let stats = engine.cache().stats();
    assert_eq!(stats.compiles, 2);
    assert_eq!(stats.evictions, 1);
}

#[test]
fn independent_engines_have_independent_caches() {
    let a = Engine::with_workers(1);
    let b = Engine::with_workers(1);
    for engine in [&a, &b] {
        engine.set_facts(Facts::new().set("a", 1_i64));
        engine.set_rules(vec![Rule::new(["a"], "result_end", "a")]);
    }
    let _ = a.run_default();
    assert_eq!(a.cache().len(), 1);
    assert!(b.cache().is_empty());
}

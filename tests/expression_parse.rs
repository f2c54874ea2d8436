use chainfire::parse::parse;
use chainfire::{
    BinaryOp, CompareOp, Expr, Expression, Facts, Functions, ParseError, UnaryOp, Value,
};

fn fact(name: &str) -> Expr {
    Expr::Fact(name.to_owned())
}

fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[test]
fn eligibility_expression() {
    let parsed = parse(r#"account_partner == "hello" && account_region == "ID""#).unwrap();
    let expected = binary(
        BinaryOp::And,
        binary(
            BinaryOp::Compare(CompareOp::Eq),
            fact("account_partner"),
            lit("hello"),
        ),
        binary(
            BinaryOp::Compare(CompareOp::Eq),
            fact("account_region"),
            lit("ID"),
        ),
    );
    assert_eq!(parsed, expected);
}

#[test]
fn precedence_or_below_and() {
    let parsed = parse("a || b && c").unwrap();
    assert_eq!(
        parsed,
        binary(
            BinaryOp::Or,
            fact("a"),
            binary(BinaryOp::And, fact("b"), fact("c"))
        )
    );
}

#[test]
fn precedence_arithmetic_below_comparison() {
    let parsed = parse("a + b * 2 > 10").unwrap();
    assert_eq!(
        parsed,
        binary(
            BinaryOp::Compare(CompareOp::Gt),
            binary(
                BinaryOp::Add,
                fact("a"),
                binary(BinaryOp::Mul, fact("b"), lit(2_i64))
            ),
            lit(10_i64)
        )
    );
}

#[test]
fn left_associative_subtraction() {
    let parsed = parse("10 - 3 - 2").unwrap();
    assert_eq!(
        parsed,
        binary(
            BinaryOp::Sub,
            binary(BinaryOp::Sub, lit(10_i64), lit(3_i64)),
            lit(2_i64)
        )
    );
}

#[test]
fn parentheses_override_precedence() {
    let parsed = parse("(a || b) && c").unwrap();
    assert_eq!(
        parsed,
        binary(
            BinaryOp::And,
            binary(BinaryOp::Or, fact("a"), fact("b")),
            fact("c")
        )
    );
}

#[test]
fn unary_operators() {
    assert_eq!(
        parse("!done").unwrap(),
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(fact("done")),
        }
    );
    assert_eq!(parse("-5").unwrap(), lit(-5_i64));
    assert_eq!(parse("-2.5").unwrap(), lit(-2.5));
}

#[test]
fn function_calls_nest() {
    let parsed = parse("max(a, min(b, 3))").unwrap();
    assert_eq!(
        parsed,
        Expr::Call {
            name: "max".into(),
            args: vec![
                fact("a"),
                Expr::Call {
                    name: "min".into(),
                    args: vec![fact("b"), lit(3_i64)],
                },
            ],
        }
    );
    assert_eq!(
        parse("now()").unwrap(),
        Expr::Call {
            name: "now".into(),
            args: vec![],
        }
    );
}

#[test]
fn referenced_facts_are_listed() {
    let parsed = parse("a && f(b, [c d]) || a").unwrap();
    let mut facts = parsed.facts();
    facts.sort_unstable();
    facts.dedup();
    assert_eq!(facts, vec!["a", "b", "c d"]);
}

#[test]
fn invalid_syntax_is_rejected() {
    for source in ["", "a &&", "(a", "a b", "f(a,", "'unterminated", "[open", "1 +* 2"] {
        assert!(
            matches!(parse(source), Err(ParseError::Syntax { .. })),
            "accepted {source:?}"
        );
    }
}

#[test]
fn display_round_trips_through_parser() {
    let source = "(a + 1) * 2 >= limit && !blocked";
    let parsed = parse(source).unwrap();
    assert_eq!(parse(&parsed.to_string()).unwrap(), parsed);
}

#[test]
fn compile_checks_functions() {
    let err = Expression::compile("lookup(a)", &Functions::new()).unwrap_err();
    assert_eq!(
        err,
        ParseError::UndefinedFunction {
            name: "lookup".into()
        }
    );

    let functions = Functions::new().with("lookup", |_: &[Value]| Ok(Value::Int(7)));
    let expression = Expression::compile("lookup(a)", &functions).unwrap();
    assert_eq!(expression.source(), "lookup(a)");
    assert_eq!(expression.evaluate(&Facts::new()), Ok(Value::Int(7)));
}

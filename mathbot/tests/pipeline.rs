use mathbot::{
    catalog, classify, evaluate, interpret, normalize, Classification, Config, DispatchOutcome,
    ExpressionKind, InputError,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn outcome(raw: &str) -> DispatchOutcome {
    init();
    evaluate(raw, &Config::default()).unwrap().outcome
}

fn rendered(raw: &str) -> String {
    match outcome(raw) {
        DispatchOutcome::Success { rendered, .. } => rendered,
        failure => panic!("{raw}: {failure:?}"),
    }
}

#[test]
fn normalization_is_idempotent() {
    for raw in [
        "2 × 3",
        "√(x² + 1)",
        "∫ sin(θ) dθ",
        "lim x→∞ (1 + 1/x)^x",
        "2,5 · π",
        "∑(k, (k, 1, 10))",
        "x ≥ 3",
        "  Ln(E)  ",
        "½ + ⅓",
        "😀 + 1",
    ] {
        let once = normalize(raw);
        assert_eq!(normalize(&once), once, "{raw}");
    }
}

#[test]
fn classification_is_total() {
    for raw in ["", "???", "==", "!", "->", "((((", "integrate", "Sum(", "x<", "диффур"] {
        let _ = classify(&normalize(raw));
    }
}

#[test]
fn precedence() {
    assert_eq!(
        classify(&normalize("2*x<=5")).kind(),
        ExpressionKind::Inequality
    );
    assert_ne!(classify(&normalize("x!=3")).kind(), ExpressionKind::Factorial);
    assert_eq!(classify(&normalize("x ≠ 3")).kind(), ExpressionKind::Inequality);
    assert!(matches!(
        classify(&normalize("∫ x² dx")),
        Classification::Integral { .. }
    ));
}

#[test]
fn equation() {
    assert_eq!(rendered("x**2-4=0"), "x ∈ {-2, 2}");
    assert_eq!(rendered("x^2 − 4 = 0"), "x ∈ {-2, 2}");
}

#[test]
fn derivative() {
    assert_eq!(rendered("diff x**3"), "3*x**2");
}

#[test]
fn integral() {
    assert_eq!(rendered("integrate x**2"), "x**3/3 + C");
    assert_eq!(rendered("∫ x^2 dx"), "x**3/3 + C");
}

#[test]
fn series_default_bound() {
    assert_eq!(rendered("Sum n"), "55");
    assert_eq!(rendered("∑ n"), "55");
}

#[test]
fn failure_keeps_pipeline_usable() {
    match outcome("(2+3") {
        DispatchOutcome::Failure { expression, .. } => assert_eq!(expression, "(2+3"),
        success => panic!("{success:?}"),
    }
    assert_eq!(rendered("2+3"), "5");
}

#[test]
fn factorials_inside_comparisons() {
    init();
    let report = evaluate("3! < 7", &Config::default()).unwrap();
    assert_eq!(report.kind, ExpressionKind::Inequality);
    assert_eq!(rendered("3! < 7"), "x ∈ (-oo, oo)");
    assert_eq!(rendered("3!≠6"), "x ∈ ∅");
    let report = evaluate("x! > 2", &Config::default()).unwrap();
    assert_eq!(report.kind, ExpressionKind::Inequality);
}

#[test]
fn input_limits() {
    init();
    let config = Config::default();
    assert_eq!(
        evaluate(&"1".repeat(201), &config),
        Err(InputError::TooLong {
            length: 201,
            limit: 200
        })
    );
    assert!(evaluate(&"π".repeat(200), &config).is_ok());
    assert_eq!(evaluate("   ", &config), Err(InputError::Empty));
    assert!(interpret(&"1".repeat(500), &config).starts_with("❌ Слишком длинное выражение"));
}

#[test]
fn replies() {
    init();
    let config = Config::default();
    assert_eq!(
        interpret("2+2*2", &config),
        "🎯 *Пример:* `2+2*2`\n📚 *Решение:* Результат: `6`"
    );
    assert!(interpret("1/0", &config).starts_with("❌ *Ошибка:* деление на ноль"));
}

#[test]
fn catalog_examples_succeed() {
    for example in catalog() {
        assert!(
            outcome(example.expression).is_success(),
            "{}",
            example.expression
        );
    }
}

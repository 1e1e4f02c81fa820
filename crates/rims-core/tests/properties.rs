use proptest::prelude::*;
use rims_core::{
    is_equiv_numeric, normalize_final_answer, Answer, Domain, EquivalenceChecker, Normalizer,
};

const EXPRESSIONS: &[&str] = &[
    "x+1",
    "1+x",
    "2x",
    "x+x",
    "x^2-1",
    "(x-1)(x+1)",
    "\\frac{1}{2}",
    "0.5",
    "\\sqrt{2}",
    "y",
    "\\pi r^2",
    "\\sin^2 x+\\cos^2 x",
    "1",
    "\\frac{x}{y}",
];

fn any_domain() -> impl Strategy<Value = Domain> {
    prop_oneof![
        Just(Domain::Arithmetic),
        Just(Domain::SymbolicExpression),
        Just(Domain::SymbolicEquationOrExpression),
    ]
}

proptest! {
    #[test]
    fn tex_normalization_is_idempotent(s in "[a-z0-9 \\\\{}$=.,^()\\[\\]+-]{0,40}") {
        let once = normalize_final_answer(&s);
        prop_assert_eq!(normalize_final_answer(&once), once);
    }

    #[test]
    fn answer_normalization_is_idempotent(
        domain in any_domain(),
        s in "[a-z0-9 \\\\{}$=.,^()+-]{0,30}",
    ) {
        let normalizer = Normalizer::new(domain);
        let once = normalizer.normalize(&s);
        let twice = normalizer.normalize(&once.to_string());
        if once.is_invalid() {
            prop_assert!(twice.is_invalid());
        } else {
            prop_assert_eq!(twice, once);
        }
    }

    #[test]
    fn numeric_equivalence_is_reflexive_and_symmetric(
        a in -1e6f64..1e6,
        b in -1e6f64..1e6,
        tol in prop_oneof![Just(1e-3), Just(1e-2), Just(2e-2)],
    ) {
        prop_assert!(is_equiv_numeric(a, a, tol));
        prop_assert_eq!(is_equiv_numeric(a, b, tol), is_equiv_numeric(b, a, tol));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn symbolic_equivalence_is_reflexive_and_symmetric(
        a in prop::sample::select(EXPRESSIONS),
        b in prop::sample::select(EXPRESSIONS),
    ) {
        let checker = EquivalenceChecker::for_domain(Domain::SymbolicExpression);
        let (x, y) = (Answer::Symbolic(a.to_string()), Answer::Symbolic(b.to_string()));
        prop_assert!(checker.is_equiv(&x, &x));
        prop_assert_eq!(checker.is_equiv(&x, &y), checker.is_equiv(&y, &x));
    }
}

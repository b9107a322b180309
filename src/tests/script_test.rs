use indoc::indoc;

use crate::kernel::construction::Kernel;
use crate::script::{run_script, ScriptError};
use crate::tests::common::{expect_proposition, run};

#[test]
fn test_bounded_quantifier_script() {
    let (kernel, output) = run(indoc! {r#"
        (axiom all (forall-in S (lambda x (-> (P x) (Q x)))))
        (axiom pc (P c))
        (axiom cs (in c S))
        (deduction use
          (autobind all c)
          (autoapply -1))
        (expect use (Q c))
    "#});
    assert_eq!(output.proved, vec!["use".to_string()]);
    expect_proposition(&kernel, "use", "(Q c)");
}

#[test]
fn test_rewrite_and_lemma_script() {
    let (kernel, output) = run(indoc! {r#"
        (axiom eq (= a b))
        (axiom pa (P a a))
        (goal pb (P b a)
          (rewrite pa eq 0))

        (axiom double (forall (x) (-> (in x E) (in (* 2 x) E))))
        (axiom three (in 3 E))
        (goal six (in (* 2 3) E)
          (by-lemma double (in (* 2 3) E)))
    "#});
    assert_eq!(output.proved, vec!["pb".to_string(), "six".to_string()]);
    expect_proposition(&kernel, "pb", "(P b a)");
    expect_proposition(&kernel, "six", "(in (* 2 3) E)");
}

#[test]
fn test_nested_goals_are_not_reported() {
    let (kernel, output) = run(indoc! {r#"
        (goal outer (forall (x) (-> (P x) (and (P x) (= x x))))
          (intros y h)
          (goal inner (= y y)
            (autodeduce (= y y)))
          (autodeduce (and (P y) (= y y))))
    "#});
    assert_eq!(output.proved, vec!["outer".to_string()]);
    assert!(kernel.lookup("inner").is_err());
    assert_eq!(kernel.depth(), 1);
}

#[test]
fn test_failed_goal_leaves_nothing_behind() {
    let mut kernel = Kernel::new();
    let err = run_script(
        &mut kernel,
        indoc! {r#"
            (axiom p p)
            (goal wrong q
              (suppose extra r)
              (deduction
                (apply p p)))
        "#},
    )
    .unwrap_err();
    assert!(matches!(err, ScriptError::Kernel { line: 5, .. }));
    assert_eq!(kernel.depth(), 1);
    assert!(kernel.lookup("extra").is_err());
    assert!(kernel.lookup("p").is_ok());
}

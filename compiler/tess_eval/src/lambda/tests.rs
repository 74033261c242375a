use super::*;
use crate::value::Slot;

fn names(list: &[&str]) -> Vec<Name> {
    list.iter().map(|s| Name::new(s)).collect()
}

fn deps(list: &[&str]) -> FxHashSet<Name> {
    list.iter().map(|s| Name::new(s)).collect()
}

#[test]
fn free_set_excludes_params_and_positionals() {
    let template = LambdaTemplate::new(
        names(&["x"]),
        Program::new(),
        deps(&["x", "$1", "scale", "offset"]),
    );
    assert_eq!(template.free, names(&["offset", "scale"]));
}

#[test]
fn from_template_starts_with_an_empty_closure() {
    let template = LambdaTemplate::new(names(&["a", "b"]), Program::new(), deps(&["k"]));
    let lambda = Lambda::from_template(Name::new("f"), &template);
    assert_eq!(lambda.arity(), 2);
    assert!(lambda.closure.is_empty());
    assert!(Rc::ptr_eq(&lambda.body, &template.body));
    assert!(!lambda.is_complete());
}

#[test]
fn captured_names_are_resolved() {
    let template = LambdaTemplate::new(Vec::new(), Program::new(), deps(&["a", "b"]));
    let mut lambda = Lambda::from_template(Name::new("g"), &template);
    lambda.closure.insert(Name::new("a"), Slot::Nil);

    let unresolved: Vec<&Name> = lambda.unresolved().collect();
    assert_eq!(unresolved, vec![&Name::new("b")]);

    lambda.closure.insert(Name::new("b"), Slot::Nil);
    assert!(lambda.is_complete());
}

#[test]
fn closed_lambda_is_complete() {
    let template = LambdaTemplate::new(names(&["n"]), Program::new(), deps(&["n"]));
    assert!(Lambda::from_template(Name::new("id"), &template).is_complete());
}

use super::*;
use crate::uplc::{Constant, DefaultFunction};

fn add_var(t: &mut IRTree, index: u32) -> NodeId {
    let add = t.builtin(DefaultFunction::AddInteger);
    let v = t.var(index);
    t.app(add, v).unwrap()
}

fn resolved(mut t: IRTree, root: NodeId) -> (IRTree, Resolution) {
    t.set_root(root).unwrap();
    let resolution = resolve_sharing(&mut t).unwrap();
    (t, resolution)
}

#[test]
fn variable_letted_keeps_its_scope() {
    let mut t = IRTree::new();
    let v0 = t.var(0);
    let l0 = t.letted(1, v0);
    let f0 = t.func(1, l0);
    let v1 = t.var(0);
    let l1 = t.letted(1, v1);
    let f1 = t.func(1, l1);
    let app = t.app(f0, f1).unwrap();
    let delayed = t.delayed(app);
    let root = t.forced(delayed);

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(t.to_string(), @"(forced (delayed [(func 1 (var 0)) (func 1 (var 0))]))");
    assert_eq!(resolution.inlined, 2);
    assert_eq!(resolution.letted, 0);
}

#[test]
fn variable_letted_same_scope_different_indices() {
    let mut t = IRTree::new();
    let v2 = t.var(2);
    let inner_letted = t.letted(3, v2);
    let inner = t.func(2, inner_letted);
    let v0 = t.var(0);
    let outer_letted = t.letted(1, v0);
    let app = t.app(inner, outer_letted).unwrap();
    let root = t.func(1, app);

    let (t, _) = resolved(t, root);
    insta::assert_snapshot!(t.to_string(), @"(func 1 [(func 2 (var 2)) (var 0)])");
}

#[test]
fn single_occurrence_still_gets_a_binder() {
    let mut t = IRTree::new();
    let v = t.var(0);
    let one = t.constant(Constant::integer(1));
    let value = t.app(v, one).unwrap();
    let l = t.letted(1, value);
    let d = t.delayed(l);
    let root = t.func(1, d);

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"(func 1 (delayed [(func 1 (var 0)) [(var 0) (con integer 1)]]))"
    );
    assert_eq!(resolution.letted, 1);
}

#[test]
fn occurrence_in_binder_body_is_bound_inside_the_binder() {
    let mut t = IRTree::new();
    let v = t.var(0);
    let one = t.constant(Constant::integer(1));
    let value = t.app(v, one).unwrap();
    let l = t.letted(1, value);
    let root = t.func(1, l);

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"(func 1 [(func 1 (var 0)) [(var 0) (con integer 1)]])"
    );
    assert_eq!(resolution.letted, 1);
}

#[test]
fn shared_letted_is_bound_at_common_ancestor() {
    let mut t = IRTree::new();
    let a = add_var(&mut t, 0);
    let la = t.letted(1, a);
    let da = t.delayed(la);
    let b = add_var(&mut t, 0);
    let lb = t.letted(1, b);
    let fb = t.forced(lb);
    let app = t.app(da, fb).unwrap();
    let root = t.func(1, app);

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"(func 1 [(func 1 [(delayed (var 0)) (forced (var 0))]) [(builtin addInteger) (var 0)]])"
    );
    assert_eq!(resolution.letted, 1);
}

#[test]
fn binding_goes_to_the_shallower_occurrence() {
    // (func 1 [(letted 1 [add (var 0)]) (func 1 (letted 2 [add (var 1)]))])
    let mut t = IRTree::new();
    let shallow_value = add_var(&mut t, 0);
    let shallow = t.letted(1, shallow_value);
    let deep_value = add_var(&mut t, 1);
    let deep = t.letted(2, deep_value);
    let inner = t.func(1, deep);
    let app = t.app(shallow, inner).unwrap();
    let root = t.func(1, app);

    let (t, _) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"(func 1 [(func 1 [(var 0) (func 1 (var 1))]) [(builtin addInteger) (var 0)]])"
    );
}

#[test]
fn equal_values_under_different_binders_stay_apart() {
    let mut t = IRTree::new();
    let left_value = add_var(&mut t, 0);
    let left_letted = t.letted(2, left_value);
    let left = t.func(1, left_letted);
    let right_value = add_var(&mut t, 0);
    let right_letted = t.letted(2, right_value);
    let right = t.func(1, right_letted);
    let app = t.app(left, right).unwrap();
    let root = t.func(1, app);

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"(func 1 [(func 1 [(func 1 (var 0)) [(builtin addInteger) (var 0)]]) (func 1 [(func 1 (var 0)) [(builtin addInteger) (var 0)]])])"
    );
    assert_eq!(resolution.letted, 2);
}

#[test]
fn values_on_a_shared_binder_merge_across_branches() {
    let mut t = IRTree::new();
    let left_value = add_var(&mut t, 1);
    let left_letted = t.letted(2, left_value);
    let left = t.func(1, left_letted);
    let right_value = add_var(&mut t, 1);
    let right_letted = t.letted(2, right_value);
    let right = t.func(1, right_letted);
    let app = t.app(left, right).unwrap();
    let root = t.func(1, app);

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"(func 1 [(func 1 [(func 1 (var 1)) (func 1 (var 1))]) [(builtin addInteger) (var 0)]])"
    );
    assert_eq!(resolution.letted, 1);
}

#[test]
fn nested_letted_resolves_inner_first() {
    // (func 1 [(letted 1 [(letted 1 [add (var 0)]) (con 1)]) <same>])
    let mut t = IRTree::new();
    let mut outer = Vec::new();
    for _ in 0..2 {
        let inner_value = add_var(&mut t, 0);
        let inner = t.letted(1, inner_value);
        let one = t.constant(Constant::integer(1));
        let value = t.app(inner, one).unwrap();
        outer.push(t.letted(1, value));
    }
    let app = t.app(outer[0], outer[1]).unwrap();
    let root = t.func(1, app);

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"(func 1 [(func 1 [(func 1 [(var 0) (var 0)]) [(var 0) (con integer 1)]]) [(builtin addInteger) (var 0)]])"
    );
    assert_eq!(resolution.letted, 2);
}

#[test]
fn overlapping_groups_follow_discovery_order() {
    // (func 1 [(letted 1 [add (var 0)])
    //          (func 1 [(letted 2 [mul (var 0)]) (letted 2 [add (var 1)])])])
    let mut t = IRTree::new();
    let a_value = add_var(&mut t, 0);
    let a = t.letted(1, a_value);
    let mul = t.builtin(DefaultFunction::MultiplyInteger);
    let v = t.var(0);
    let b_value = t.app(mul, v).unwrap();
    let b = t.letted(2, b_value);
    let a2_value = add_var(&mut t, 1);
    let a2 = t.letted(2, a2_value);
    let inner_app = t.app(b, a2).unwrap();
    let inner = t.func(1, inner_app);
    let app = t.app(a, inner).unwrap();
    let root = t.func(1, app);

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"(func 1 [(func 1 [(var 0) (func 1 [[(func 1 (var 0)) [(builtin multiplyInteger) (var 0)]] (var 1)])]) [(builtin addInteger) (var 0)]])"
    );
    assert_eq!(resolution.letted, 2);
}

#[test]
fn letted_at_the_root_becomes_the_root_binding() {
    let mut t = IRTree::new();
    let add = t.builtin(DefaultFunction::AddInteger);
    let one = t.constant(Constant::integer(1));
    let value = t.app(add, one).unwrap();
    let root = t.letted(0, value);

    let (t, _) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"[(func 1 (var 0)) [(builtin addInteger) (con integer 1)]]"
    );
}

#[test]
fn hoisted_chain_keeps_dependencies_in_scope() {
    // [(hoisted (delayed (hoisted (con 7)))) (hoisted (con 7))]
    let mut t = IRTree::new();
    let seven = t.constant(Constant::integer(7));
    let inner = t.hoisted(seven);
    let delayed = t.delayed(inner);
    let outer = t.hoisted(delayed);
    let seven_again = t.constant(Constant::integer(7));
    let plain = t.hoisted(seven_again);
    let root = t.app(outer, plain).unwrap();

    let (t, resolution) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"[(func 1 [(func 1 [(var 0) (var 1)]) (delayed (var 0))]) (con integer 7)]"
    );
    assert_eq!(resolution.hoisted, 2);
}

#[test]
fn hoisted_values_are_bound_above_the_body() {
    // (func 1 [(var 0) (hoisted [add (con 1)])])
    let mut t = IRTree::new();
    let v = t.var(0);
    let add = t.builtin(DefaultFunction::AddInteger);
    let one = t.constant(Constant::integer(1));
    let value = t.app(add, one).unwrap();
    let h = t.hoisted(value);
    let app = t.app(v, h).unwrap();
    let root = t.func(1, app);

    let (t, _) = resolved(t, root);
    insta::assert_snapshot!(
        t.to_string(),
        @"[(func 1 (func 1 [(var 0) (var 1)])) [(builtin addInteger) (con integer 1)]]"
    );
}

#[test]
fn sharing_free_tree_is_unchanged() {
    let mut t = IRTree::new();
    let v = t.var(0);
    let root = t.func(1, v);
    t.set_root(root).unwrap();
    let before = t.root_hash();
    let resolution = resolve_sharing(&mut t).unwrap();
    assert_eq!(resolution, Resolution::default());
    assert_eq!(t.root_hash(), before);
}

#[test]
fn empty_tree_is_rejected() {
    let mut t = IRTree::new();
    assert_eq!(resolve_sharing(&mut t), Err(IntegrityError::MissingRoot));
}

#[test]
fn deep_programs_resolve_without_recursion() {
    let mut t = IRTree::new();
    let add = t.builtin(DefaultFunction::AddInteger);
    let one = t.constant(Constant::integer(1));
    let value = t.app(add, one).unwrap();
    let mut id = t.letted(0, value);
    for _ in 0..50_000 {
        id = t.delayed(id);
    }
    t.set_root(id).unwrap();
    let resolution = resolve_sharing(&mut t).unwrap();
    assert_eq!(resolution.letted, 1);
    assert!(navigate::find_all(&t, t.root().unwrap(), IRNode::is_sharing).is_empty());
}

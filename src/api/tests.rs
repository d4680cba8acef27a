use super::*;
use crate::ir::NodeId;
use crate::uplc::{Constant, DefaultFunction};

fn square(t: &mut IRTree) -> NodeId {
    let mul = t.builtin(DefaultFunction::MultiplyInteger);
    let a = t.var(0);
    let partial = t.app(mul, a).unwrap();
    let b = t.var(0);
    t.app(partial, b).unwrap()
}

/// `[(func 1 [[add sq] sq]) (con integer 5)]` where both `sq = x * x`
/// are letted.
fn shared_square() -> IRTree {
    let mut t = IRTree::new();
    let add = t.builtin(DefaultFunction::AddInteger);
    let sq1 = square(&mut t);
    let l1 = t.letted(1, sq1);
    let sq2 = square(&mut t);
    let l2 = t.letted(1, sq2);
    let partial = t.app(add, l1).unwrap();
    let body = t.app(partial, l2).unwrap();
    let func = t.func(1, body);
    let five = t.constant(Constant::integer(5));
    let root = t.app(func, five).unwrap();
    t.set_root(root).unwrap();
    t
}

/// `[inc [inc (con integer 3)]]` with `inc = [add (con integer 1)]` hoisted.
fn hoisted_increment() -> IRTree {
    let mut t = IRTree::new();
    let inc = |t: &mut IRTree| {
        let add = t.builtin(DefaultFunction::AddInteger);
        let one = t.constant(Constant::integer(1));
        let value = t.app(add, one).unwrap();
        t.hoisted(value)
    };
    let outer = inc(&mut t);
    let inner = inc(&mut t);
    let three = t.constant(Constant::integer(3));
    let arg = t.app(inner, three).unwrap();
    let root = t.app(outer, arg).unwrap();
    t.set_root(root).unwrap();
    t
}

#[test]
fn compile_binds_shared_letted_once() {
    let term = compile_term(shared_square()).unwrap();
    insta::assert_snapshot!(
        term.to_string(),
        @"[(lam [(lam [[(builtin addInteger) i0] i0]) [[(builtin multiplyInteger) i0] i0]]) (con integer 5)]"
    );
}

#[test]
fn compile_binds_hoisted_at_the_top() {
    let term = compile_term(hoisted_increment()).unwrap();
    insta::assert_snapshot!(
        term.to_string(),
        @"[(lam [i0 [i0 (con integer 3)]]) [(builtin addInteger) (con integer 1)]]"
    );
}

#[test]
fn compiled_programs_evaluate() {
    let program = compile_program(shared_square(), &CompileOptions::default()).unwrap();
    let result = evaluate_program(&program, &EvalOptions::default()).unwrap();
    assert_eq!(result.term, Term::constant(Constant::integer(50)));

    let term = compile_term(hoisted_increment()).unwrap();
    let result = evaluate(&term, &EvalOptions::default()).unwrap();
    assert_eq!(result.term, Term::constant(Constant::integer(5)));
}

#[test]
fn compile_flat_decodes_back_to_the_program() {
    let options = CompileOptions::for_version(Version::new(1, 1, 0));
    let bytes = compile_flat(shared_square(), &options).unwrap();
    let program = decode(&bytes).unwrap();
    assert_eq!(program.version, Version::new(1, 1, 0));
    assert_eq!(program, compile_program(shared_square(), &options).unwrap());
}

#[test]
fn custom_padding_is_applied() {
    let options = CompileOptions::default().with_padding(PadOptions::zeros());
    let bytes = compile_flat(hoisted_increment(), &options).unwrap();
    assert!(matches!(decode(&bytes), Err(Error::Codec(_))));
    let program = flat::decode_program_with(&bytes, &PadOptions::zeros()).unwrap();
    assert_eq!(program.term, compile_term(hoisted_increment()).unwrap());
}

#[test]
fn evaluate_flat_runs_encoded_programs() {
    let bytes = [0x01, 0x00, 0x00, 0x48, 0x15, 0x01];
    let result = evaluate_flat(&bytes, &EvalOptions::default()).unwrap();
    insta::assert_snapshot!(result.term.to_string(), @"(con integer 42)");
    assert_eq!(result.steps, 1);
}

#[test]
fn errors_are_wrapped_per_stage() {
    assert_eq!(
        compile_term(IRTree::new()),
        Err(Error::Integrity(IntegrityError::MissingRoot))
    );
    assert!(matches!(decode(&[0x01]), Err(Error::Codec(_))));
    assert_eq!(
        evaluate(&Term::Error, &EvalOptions::default()),
        Err(Error::Machine(MachineError::ErrorTerm))
    );
}

#[test]
fn program_hash_follows_the_encoding() {
    let a = compile_program(shared_square(), &CompileOptions::default()).unwrap();
    let b = compile_program(shared_square(), &CompileOptions::default()).unwrap();
    let c = compile_program(hoisted_increment(), &CompileOptions::default()).unwrap();
    assert_eq!(program_hash(&a), program_hash(&b));
    assert_ne!(program_hash(&a), program_hash(&c));
}

#[test]
fn deep_trees_compile_encode_and_compare() {
    let mut t = IRTree::new();
    let mut node = t.constant(Constant::integer(7));
    for _ in 0..200_000 {
        node = t.delayed(node);
    }
    t.set_root(node).unwrap();

    let term = compile_term(t).unwrap();
    let expected = (0..200_000).fold(Term::constant(Constant::integer(7)), |t, _| Term::delay(t));
    assert_eq!(term, expected);

    let bytes = flat::encode_program(&Program::new(Version::v1(), term.clone()));
    assert_eq!(decode(&bytes).unwrap().term, expected);
}

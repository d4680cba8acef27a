//! Untyped Plutus Core: the bytecode produced by lowering.
//!
//! A `Term` is an immutable tree. Variables are zero-based de Bruijn
//! indices; `Lambda` binds exactly one variable. The Flat codec and the CEK
//! machine both read terms without mutating them, so a lowered program can
//! be shared freely between them.

pub mod builtin;
pub mod constant;

pub mod data;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

pub use builtin::DefaultFunction;
pub use constant::{Constant, Type};
pub use data::PlutusData;

// ─── Terms ─────────────────────────────────────────────────────────

/// Clone, equality, hashing and drop all run on explicit stacks, so terms
/// of any depth can be handled without exhausting the call stack.
pub enum Term {
    Var(u64),
    Lambda(Box<Term>),
    Apply(Box<Term>, Box<Term>),
    Delay(Box<Term>),
    Force(Box<Term>),
    Constant(Constant),
    Builtin(DefaultFunction),
    Error,
}

impl Term {
    pub fn var(index: u64) -> Self {
        Term::Var(index)
    }

    pub fn lambda(body: Term) -> Self {
        Term::Lambda(Box::new(body))
    }

    pub fn apply(function: Term, argument: Term) -> Self {
        Term::Apply(Box::new(function), Box::new(argument))
    }

    pub fn delay(term: Term) -> Self {
        Term::Delay(Box::new(term))
    }

    pub fn force(term: Term) -> Self {
        Term::Force(Box::new(term))
    }

    pub fn constant(value: Constant) -> Self {
        Term::Constant(value)
    }

    pub fn builtin(fun: DefaultFunction) -> Self {
        Term::Builtin(fun)
    }

    /// Apply `self` to each argument in turn.
    pub fn apply_all(self, args: impl IntoIterator<Item = Term>) -> Self {
        args.into_iter().fold(self, Term::apply)
    }

    /// Wrap `self` in `n` forces.
    pub fn forced(self, n: u32) -> Self {
        (0..n).fold(self, |t, _| Term::force(t))
    }

    /// Number of nodes in the term.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(t) = stack.pop() {
            count += 1;
            match t {
                Term::Lambda(b) | Term::Delay(b) | Term::Force(b) => stack.push(b),
                Term::Apply(f, a) => {
                    stack.push(a);
                    stack.push(f);
                }
                _ => {}
            }
        }
        count
    }
}

impl Drop for Term {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        detach_children(self, &mut stack);
        while let Some(mut term) = stack.pop() {
            detach_children(&mut term, &mut stack);
        }
    }
}

/// Move every non-leaf child of `term` onto `out`, leaving `Error` behind.
fn detach_children(term: &mut Term, out: &mut Vec<Term>) {
    let mut detach = |slot: &mut Box<Term>| {
        if matches!(
            **slot,
            Term::Lambda(_) | Term::Apply(..) | Term::Delay(_) | Term::Force(_)
        ) {
            out.push(mem::replace(&mut **slot, Term::Error));
        }
    };
    match term {
        Term::Lambda(body) | Term::Delay(body) | Term::Force(body) => detach(body),
        Term::Apply(fun, arg) => {
            detach(fun);
            detach(arg);
        }
        _ => {}
    }
}

impl Clone for Term {
    fn clone(&self) -> Self {
        enum Pending<'a> {
            Lambda,
            Delay,
            Force,
            ApplyFun(&'a Term),
            ApplyArg(Term),
        }

        let mut pending = Vec::new();
        let mut next = self;
        loop {
            let mut done = match next {
                Term::Lambda(body) => {
                    pending.push(Pending::Lambda);
                    next = body;
                    continue;
                }
                Term::Delay(body) => {
                    pending.push(Pending::Delay);
                    next = body;
                    continue;
                }
                Term::Force(body) => {
                    pending.push(Pending::Force);
                    next = body;
                    continue;
                }
                Term::Apply(fun, arg) => {
                    pending.push(Pending::ApplyFun(arg));
                    next = fun;
                    continue;
                }
                Term::Var(i) => Term::Var(*i),
                Term::Constant(c) => Term::Constant(c.clone()),
                Term::Builtin(b) => Term::Builtin(*b),
                Term::Error => Term::Error,
            };

            loop {
                match pending.pop() {
                    None => return done,
                    Some(Pending::Lambda) => done = Term::lambda(done),
                    Some(Pending::Delay) => done = Term::delay(done),
                    Some(Pending::Force) => done = Term::force(done),
                    Some(Pending::ApplyFun(arg)) => {
                        pending.push(Pending::ApplyArg(done));
                        next = arg;
                        break;
                    }
                    Some(Pending::ApplyArg(fun)) => done = Term::apply(fun, done),
                }
            }
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some(pair) = stack.pop() {
            match pair {
                (Term::Var(a), Term::Var(b)) if a == b => {}
                (Term::Lambda(a), Term::Lambda(b))
                | (Term::Delay(a), Term::Delay(b))
                | (Term::Force(a), Term::Force(b)) => stack.push((a, b)),
                (Term::Apply(f, a), Term::Apply(g, b)) => {
                    stack.push((a, b));
                    stack.push((f, g));
                }
                (Term::Constant(a), Term::Constant(b)) if a == b => {}
                (Term::Builtin(a), Term::Builtin(b)) if a == b => {}
                (Term::Error, Term::Error) => {}
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut stack = vec![self];
        while let Some(term) = stack.pop() {
            mem::discriminant(term).hash(state);
            match term {
                Term::Var(i) => i.hash(state),
                Term::Lambda(body) | Term::Delay(body) | Term::Force(body) => stack.push(body),
                Term::Apply(fun, arg) => {
                    stack.push(arg);
                    stack.push(fun);
                }
                Term::Constant(c) => c.hash(state),
                Term::Builtin(b) => b.hash(state),
                Term::Error => {}
            }
        }
    }
}

/// Same as the textual form.
impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Textual form: `[f a]` for application, `(lam body)` for abstraction and
/// `iN` for the variable with de Bruijn index `N`.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Item<'a> {
            Term(&'a Term),
            Text(&'static str),
        }

        let mut stack = vec![Item::Term(self)];
        while let Some(item) = stack.pop() {
            let term = match item {
                Item::Text(s) => {
                    f.write_str(s)?;
                    continue;
                }
                Item::Term(t) => t,
            };
            match term {
                Term::Var(i) => write!(f, "i{}", i)?,
                Term::Lambda(body) => {
                    f.write_str("(lam ")?;
                    stack.push(Item::Text(")"));
                    stack.push(Item::Term(body));
                }
                Term::Apply(fun, arg) => {
                    f.write_str("[")?;
                    stack.push(Item::Text("]"));
                    stack.push(Item::Term(arg));
                    stack.push(Item::Text(" "));
                    stack.push(Item::Term(fun));
                }
                Term::Delay(body) => {
                    f.write_str("(delay ")?;
                    stack.push(Item::Text(")"));
                    stack.push(Item::Term(body));
                }
                Term::Force(body) => {
                    f.write_str("(force ")?;
                    stack.push(Item::Text(")"));
                    stack.push(Item::Term(body));
                }
                Term::Constant(c) => write!(f, "(con {})", c)?,
                Term::Builtin(b) => write!(f, "(builtin {})", b)?,
                Term::Error => f.write_str("(error)")?,
            }
        }
        Ok(())
    }
}

// ─── Programs ──────────────────────────────────────────────────────

/// Language version carried in the program header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Plutus V1/V2 language version.
    pub const fn v1() -> Self {
        Self::new(1, 0, 0)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::v1()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Program {
    pub version: Version,
    pub term: Term,
}

impl Program {
    pub fn new(version: Version, term: Term) -> Self {
        Self { version, term }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(program {} {})", self.version, self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_identity_application() {
        let t = Term::apply(Term::lambda(Term::var(0)), Term::constant(Constant::integer(42)));
        insta::assert_snapshot!(t.to_string(), @"[(lam i0) (con integer 42)]");
    }

    #[test]
    fn display_program() {
        let p = Program::new(
            Version::v1(),
            Term::force(Term::builtin(DefaultFunction::IfThenElse))
                .apply_all([Term::constant(Constant::Bool(true)), Term::delay(Term::Error)]),
        );
        insta::assert_snapshot!(
            p.to_string(),
            @"(program 1.0.0 [[(force (builtin ifThenElse)) (con bool True)] (delay (error))])"
        );
    }

    #[test]
    fn size_counts_every_node() {
        let t = Term::apply(Term::lambda(Term::var(0)), Term::Error);
        assert_eq!(t.size(), 4);
    }

    #[test]
    fn deep_terms_display_without_recursion() {
        let mut t = Term::var(0);
        for _ in 0..5_000 {
            t = Term::delay(t);
        }
        let s = t.to_string();
        assert!(s.starts_with("(delay (delay"));
        assert_eq!(t.size(), 5_001);
    }

    fn deep(depth: usize, leaf: Term) -> Term {
        (0..depth).fold(leaf, |t, i| {
            if i % 2 == 0 {
                Term::lambda(t)
            } else {
                Term::apply(Term::Error, Term::force(t))
            }
        })
    }

    #[test]
    fn deep_terms_clone_compare_and_drop() {
        let a = deep(300_000, Term::var(0));
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, deep(300_000, Term::var(1)));
        assert_eq!(b.size(), a.size());
        drop(a);
        drop(b);
    }

    #[test]
    fn deep_terms_hash_like_their_clones() {
        use std::collections::hash_map::DefaultHasher;

        let digest = |t: &Term| {
            let mut h = DefaultHasher::new();
            t.hash(&mut h);
            h.finish()
        };
        let a = deep(200_000, Term::constant(Constant::integer(7)));
        assert_eq!(digest(&a), digest(&a.clone()));
        assert_ne!(digest(&a), digest(&deep(200_000, Term::Error)));
    }

    #[test]
    fn equality_sees_every_difference() {
        let t = Term::apply(Term::lambda(Term::var(0)), Term::builtin(DefaultFunction::AddInteger));
        assert_eq!(t, t.clone());
        assert_ne!(t, Term::apply(Term::lambda(Term::var(1)), Term::builtin(DefaultFunction::AddInteger)));
        assert_ne!(t, Term::apply(Term::delay(Term::var(0)), Term::builtin(DefaultFunction::AddInteger)));
        assert_ne!(Term::Error, Term::var(0));
    }
}

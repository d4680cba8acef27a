//! Machine values, environments and discharge back to terms.

use std::fmt;
use std::rc::Rc;

use crate::uplc::{Constant, DefaultFunction, PlutusData, Term};

// ─── Values ────────────────────────────────────────────────────────

/// Result of computing a term. Closures borrow their body from the
/// evaluated program.
#[derive(Clone, Debug)]
pub enum Value<'a> {
    Con(Rc<Constant>),
    Delay(&'a Term, Env<'a>),
    /// A lambda with its body.
    Lambda(&'a Term, Env<'a>),
    /// A builtin with the forces and arguments it has received so far.
    Builtin {
        fun: DefaultFunction,
        forces: u32,
        args: Vec<Value<'a>>,
    },
}

impl<'a> Value<'a> {
    pub fn con(constant: Constant) -> Self {
        Value::Con(Rc::new(constant))
    }

    pub fn integer(n: impl Into<num_bigint::BigInt>) -> Self {
        Value::con(Constant::integer(n))
    }

    pub fn bool(b: bool) -> Self {
        Value::con(Constant::Bool(b))
    }

    pub fn unit() -> Self {
        Value::con(Constant::Unit)
    }

    pub fn data(d: PlutusData) -> Self {
        Value::con(Constant::Data(d))
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Value::Con(c) => Some(c),
            _ => None,
        }
    }

    /// Substitute the captured environments back into the terms.
    pub fn discharge(&self) -> Term {
        discharge(self)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.discharge())
    }
}

// ─── Environments ──────────────────────────────────────────────────

/// Persistent list of bound values, innermost first.
#[derive(Clone, Debug, Default)]
pub struct Env<'a>(Option<Rc<EnvNode<'a>>>);

#[derive(Debug)]
struct EnvNode<'a> {
    value: Value<'a>,
    next: Env<'a>,
}

impl<'a> Env<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: Value<'a>) -> Self {
        Env(Some(Rc::new(EnvNode {
            value,
            next: self.clone(),
        })))
    }

    /// Value bound to de Bruijn index `index`.
    pub fn lookup(&self, index: u64) -> Option<&Value<'a>> {
        let mut node = self.0.as_deref()?;
        for _ in 0..index {
            node = node.next.0.as_deref()?;
        }
        Some(&node.value)
    }
}

impl Drop for Env<'_> {
    // Unlink uniquely owned nodes one at a time instead of recursively.
    fn drop(&mut self) {
        let mut next = self.0.take();
        while let Some(node) = next {
            next = match Rc::try_unwrap(node) {
                Ok(mut node) => node.next.0.take(),
                Err(_) => None,
            };
        }
    }
}

// ─── Discharge ─────────────────────────────────────────────────────

enum Task<'a> {
    Value(Value<'a>),
    Term(&'a Term, Env<'a>, u64),
    Lambda,
    Delay,
    Force,
    Apply,
}

fn discharge(value: &Value<'_>) -> Term {
    let mut tasks = vec![Task::Value(value.clone())];
    let mut out: Vec<Term> = Vec::new();

    while let Some(task) = tasks.pop() {
        match task {
            Task::Value(Value::Con(c)) => out.push(Term::Constant((*c).clone())),
            Task::Value(Value::Delay(body, env)) => {
                tasks.push(Task::Delay);
                tasks.push(Task::Term(body, env, 0));
            }
            Task::Value(Value::Lambda(body, env)) => {
                tasks.push(Task::Lambda);
                tasks.push(Task::Term(body, env, 1));
            }
            Task::Value(Value::Builtin { fun, forces, args }) => {
                out.push(Term::builtin(fun).forced(forces));
                for arg in args.into_iter().rev() {
                    tasks.push(Task::Apply);
                    tasks.push(Task::Value(arg));
                }
            }
            Task::Term(term, env, local) => match term {
                Term::Var(i) if *i < local => out.push(Term::Var(*i)),
                Term::Var(i) => match env.lookup(i - local) {
                    Some(v) => tasks.push(Task::Value(v.clone())),
                    None => out.push(Term::Var(*i)),
                },
                Term::Lambda(body) => {
                    tasks.push(Task::Lambda);
                    tasks.push(Task::Term(body, env, local + 1));
                }
                Term::Delay(body) => {
                    tasks.push(Task::Delay);
                    tasks.push(Task::Term(body, env, local));
                }
                Term::Force(body) => {
                    tasks.push(Task::Force);
                    tasks.push(Task::Term(body, env, local));
                }
                Term::Apply(fun, arg) => {
                    tasks.push(Task::Apply);
                    tasks.push(Task::Term(arg, env.clone(), local));
                    tasks.push(Task::Term(fun, env, local));
                }
                Term::Constant(_) | Term::Builtin(_) | Term::Error => out.push(term.clone()),
            },
            Task::Lambda => {
                let body = pop(&mut out);
                out.push(Term::lambda(body));
            }
            Task::Delay => {
                let body = pop(&mut out);
                out.push(Term::delay(body));
            }
            Task::Force => {
                let body = pop(&mut out);
                out.push(Term::force(body));
            }
            Task::Apply => {
                let arg = pop(&mut out);
                let fun = pop(&mut out);
                out.push(Term::apply(fun, arg));
            }
        }
    }
    pop(&mut out)
}

fn pop(out: &mut Vec<Term>) -> Term {
    out.pop().unwrap_or(Term::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_counts_from_the_innermost_binding() {
        let env = Env::new().push(Value::integer(1)).push(Value::integer(2));
        assert_eq!(
            env.lookup(0).and_then(Value::as_constant),
            Some(&Constant::integer(2))
        );
        assert_eq!(
            env.lookup(1).and_then(Value::as_constant),
            Some(&Constant::integer(1))
        );
        assert!(env.lookup(2).is_none());
    }

    #[test]
    fn discharge_substitutes_captured_values() {
        // (lam [i0 i1]) closed over i1 = 7
        let body = Term::apply(Term::var(0), Term::var(1));
        let env = Env::new().push(Value::integer(7));
        let closure = Value::Lambda(&body, env);
        insta::assert_snapshot!(closure.discharge().to_string(), @"(lam [i0 (con integer 7)])");
    }

    #[test]
    fn discharge_rebuilds_partial_builtins() {
        let partial = Value::Builtin {
            fun: DefaultFunction::IfThenElse,
            forces: 1,
            args: vec![Value::bool(true)],
        };
        insta::assert_snapshot!(
            partial.discharge().to_string(),
            @"[(force (builtin ifThenElse)) (con bool True)]"
        );
    }

    #[test]
    fn long_environments_drop_iteratively() {
        let mut env = Env::new();
        for i in 0..200_000 {
            env = env.push(Value::integer(i));
        }
        drop(env);
    }
}

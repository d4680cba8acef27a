//! CEK machine for untyped Plutus Core.
//!
//! The machine alternates between computing a term in an environment and
//! returning a value to the innermost continuation frame. Frames live on an
//! explicit stack, so evaluation depth is bounded by memory, not by the
//! native call stack. The evaluated term is only borrowed.

mod builtins;
mod error;
mod value;

pub use builtins::{BuiltinSemantics, StandardBuiltins};
pub use error::MachineError;
pub use value::{Env, Value};

use tracing::{debug, instrument};

use crate::uplc::Term;

/// Options for one evaluation.
#[derive(Clone, Debug, Default)]
pub struct EvalOptions {
    /// Fail once this many compute steps have been taken.
    pub step_limit: Option<u64>,
}

impl EvalOptions {
    pub fn with_step_limit(limit: u64) -> Self {
        Self {
            step_limit: Some(limit),
        }
    }
}

/// A finished evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// The resulting value, discharged back to a term.
    pub term: Term,
    /// Number of compute steps taken.
    pub steps: u64,
    /// Messages emitted by `trace`, in order.
    pub logs: Vec<String>,
}

enum Frame<'a> {
    /// Evaluate the argument, then apply the function value to it.
    ApplyArg(&'a Term, Env<'a>),
    /// Apply this function value to the returned argument.
    ApplyFun(Value<'a>),
    Force,
}

enum State<'a> {
    Compute(&'a Term, Env<'a>),
    Return(Value<'a>),
}

/// Evaluate `term` with the standard builtins.
pub fn evaluate(term: &Term, options: &EvalOptions) -> Result<Evaluation, MachineError> {
    Machine::new(&StandardBuiltins, options).run(term)
}

pub struct Machine<'b, B: BuiltinSemantics + ?Sized> {
    builtins: &'b B,
    step_limit: Option<u64>,
    steps: u64,
    logs: Vec<String>,
}

impl<'b, B: BuiltinSemantics + ?Sized> Machine<'b, B> {
    pub fn new(builtins: &'b B, options: &EvalOptions) -> Self {
        Self {
            builtins,
            step_limit: options.step_limit,
            steps: 0,
            logs: Vec::new(),
        }
    }

    #[instrument(skip_all, name = "eval")]
    pub fn run(mut self, term: &Term) -> Result<Evaluation, MachineError> {
        let mut frames: Vec<Frame<'_>> = Vec::new();
        let mut state = State::Compute(term, Env::new());

        loop {
            state = match state {
                State::Compute(term, env) => {
                    self.step()?;
                    self.compute(term, env, &mut frames)?
                }
                State::Return(value) => match frames.pop() {
                    None => {
                        debug!(steps = self.steps, logs = self.logs.len(), "evaluation finished");
                        return Ok(Evaluation {
                            term: value.discharge(),
                            steps: self.steps,
                            logs: self.logs,
                        });
                    }
                    Some(Frame::ApplyArg(arg, env)) => {
                        frames.push(Frame::ApplyFun(value));
                        State::Compute(arg, env)
                    }
                    Some(Frame::ApplyFun(fun)) => self.apply(fun, value)?,
                    Some(Frame::Force) => self.force(value)?,
                },
            };
        }
    }

    fn step(&mut self) -> Result<(), MachineError> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(MachineError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    fn compute<'a>(
        &mut self,
        term: &'a Term,
        env: Env<'a>,
        frames: &mut Vec<Frame<'a>>,
    ) -> Result<State<'a>, MachineError> {
        Ok(match term {
            Term::Var(index) => State::Return(
                env.lookup(*index)
                    .cloned()
                    .ok_or(MachineError::UnboundVariable { index: *index })?,
            ),
            Term::Lambda(body) => State::Return(Value::Lambda(body, env)),
            Term::Delay(body) => State::Return(Value::Delay(body, env)),
            Term::Apply(fun, arg) => {
                frames.push(Frame::ApplyArg(arg, env.clone()));
                State::Compute(fun, env)
            }
            Term::Force(body) => {
                frames.push(Frame::Force);
                State::Compute(body, env)
            }
            Term::Constant(c) => State::Return(Value::con(c.clone())),
            Term::Builtin(fun) => State::Return(Value::Builtin {
                fun: *fun,
                forces: 0,
                args: Vec::new(),
            }),
            Term::Error => return Err(MachineError::ErrorTerm),
        })
    }

    fn apply<'a>(&mut self, fun: Value<'a>, arg: Value<'a>) -> Result<State<'a>, MachineError> {
        match fun {
            Value::Lambda(body, env) => Ok(State::Compute(body, env.push(arg))),
            Value::Builtin {
                fun,
                forces,
                mut args,
            } => {
                if forces < fun.force_count() {
                    return Err(MachineError::BuiltinTermArgumentExpected { fun });
                }
                args.push(arg);
                if args.len() < fun.arity() {
                    return Ok(State::Return(Value::Builtin { fun, forces, args }));
                }
                let result = self.builtins.call(fun, args, &mut self.logs)?;
                Ok(State::Return(result))
            }
            other => Err(MachineError::NonFunctionalApplication {
                value: other.to_string(),
            }),
        }
    }

    fn force<'a>(&mut self, value: Value<'a>) -> Result<State<'a>, MachineError> {
        match value {
            Value::Delay(body, env) => Ok(State::Compute(body, env)),
            Value::Builtin { fun, forces, args }
                if forces < fun.force_count() && args.is_empty() =>
            {
                Ok(State::Return(Value::Builtin {
                    fun,
                    forces: forces + 1,
                    args,
                }))
            }
            other => Err(MachineError::NonPolymorphicInstantiation {
                value: other.to_string(),
            }),
        }
    }
}

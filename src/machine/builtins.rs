//! Builtin function semantics.

use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use sha2::{Digest, Sha256};
use tracing::trace;

use super::{MachineError, Value};
use crate::uplc::{Constant, DefaultFunction, PlutusData, Type};

/// Evaluation rules for saturated builtin applications.
///
/// The machine only calls `call` once a builtin has received all of its
/// forces and exactly `fun.arity()` arguments.
pub trait BuiltinSemantics {
    fn call<'a>(
        &self,
        fun: DefaultFunction,
        args: Vec<Value<'a>>,
        logs: &mut Vec<String>,
    ) -> Result<Value<'a>, MachineError>;
}

/// Integer, byte string, string, control, pair, list and data builtins,
/// plus `sha2_256`. Signature, `sha3_256` and `blake2b_256` are not
/// available.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardBuiltins;

impl BuiltinSemantics for StandardBuiltins {
    fn call<'a>(
        &self,
        fun: DefaultFunction,
        args: Vec<Value<'a>>,
        logs: &mut Vec<String>,
    ) -> Result<Value<'a>, MachineError> {
        use DefaultFunction::*;

        let mut args = args.into_iter();
        let mut next = || {
            args.next()
                .ok_or(MachineError::BuiltinTermArgumentExpected { fun })
        };

        let value = match fun {
            // ── Integers ──
            AddInteger | SubtractInteger | MultiplyInteger | DivideInteger | QuotientInteger
            | RemainderInteger | ModInteger => {
                let a = integer(fun, &next()?)?;
                let b = integer(fun, &next()?)?;
                Value::integer(arithmetic(fun, a, b)?)
            }
            EqualsInteger | LessThanInteger | LessThanEqualsInteger => {
                let a = integer(fun, &next()?)?;
                let b = integer(fun, &next()?)?;
                Value::bool(match fun {
                    EqualsInteger => a == b,
                    LessThanInteger => a < b,
                    _ => a <= b,
                })
            }

            // ── Byte strings ──
            AppendByteString => {
                let mut a = bytes(fun, &next()?)?;
                a.extend(bytes(fun, &next()?)?);
                Value::con(Constant::ByteString(a))
            }
            ConsByteString => {
                let n = integer(fun, &next()?)?;
                let mut bs = bytes(fun, &next()?)?;
                let byte = floor_mod(&n, &BigInt::from(256u32)).to_u8().unwrap_or(0);
                bs.insert(0, byte);
                Value::con(Constant::ByteString(bs))
            }
            SliceByteString => {
                let start = integer(fun, &next()?)?;
                let len = integer(fun, &next()?)?;
                let bs = bytes(fun, &next()?)?;
                Value::con(Constant::ByteString(slice(&bs, &start, &len)))
            }
            LengthOfByteString => {
                let bs = bytes(fun, &next()?)?;
                Value::integer(bs.len())
            }
            IndexByteString => {
                let bs = bytes(fun, &next()?)?;
                let i = integer(fun, &next()?)?;
                let byte = i
                    .to_usize()
                    .and_then(|i| bs.get(i).copied())
                    .ok_or_else(|| MachineError::IndexOutOfRange {
                        fun,
                        index: i.to_string(),
                    })?;
                Value::integer(byte)
            }
            EqualsByteString | LessThanByteString | LessThanEqualsByteString => {
                let a = bytes(fun, &next()?)?;
                let b = bytes(fun, &next()?)?;
                Value::bool(match fun {
                    EqualsByteString => a == b,
                    LessThanByteString => a < b,
                    _ => a <= b,
                })
            }
            Sha2_256 => {
                let bs = bytes(fun, &next()?)?;
                Value::con(Constant::ByteString(Sha256::digest(&bs).to_vec()))
            }

            // ── Strings ──
            AppendString => {
                let a = string(fun, &next()?)?;
                let b = string(fun, &next()?)?;
                Value::con(Constant::String(a + &b))
            }
            EqualsString => {
                let a = string(fun, &next()?)?;
                let b = string(fun, &next()?)?;
                Value::bool(a == b)
            }
            EncodeUtf8 => {
                let s = string(fun, &next()?)?;
                Value::con(Constant::ByteString(s.into_bytes()))
            }
            DecodeUtf8 => {
                let bs = bytes(fun, &next()?)?;
                let s = String::from_utf8(bs).map_err(|_| MachineError::InvalidUtf8)?;
                Value::con(Constant::String(s))
            }

            // ── Control ──
            IfThenElse => {
                let cond = boolean(fun, &next()?)?;
                let then = next()?;
                let otherwise = next()?;
                if cond {
                    then
                } else {
                    otherwise
                }
            }
            ChooseUnit => {
                unit(fun, &next()?)?;
                next()?
            }
            Trace => {
                let message = string(fun, &next()?)?;
                trace!(%message, "trace");
                logs.push(message);
                next()?
            }

            // ── Pairs ──
            FstPair | SndPair => {
                let (a, b) = pair(fun, &next()?)?;
                Value::con(if fun == FstPair { a } else { b })
            }

            // ── Lists ──
            ChooseList => {
                let (_, items) = list(fun, &next()?)?;
                let empty = next()?;
                let other = next()?;
                if items.is_empty() {
                    empty
                } else {
                    other
                }
            }
            MkCons => {
                let head = next()?;
                let (ty, mut items) = list(fun, &next()?)?;
                let item = constant(fun, &head)?;
                if item.type_of() != ty {
                    return Err(unexpected(fun, &head));
                }
                items.insert(0, item.clone());
                Value::con(Constant::ProtoList(ty, items))
            }
            HeadList | TailList => {
                let (ty, mut items) = list(fun, &next()?)?;
                if items.is_empty() {
                    return Err(MachineError::EmptyList { fun });
                }
                let head = items.remove(0);
                Value::con(if fun == HeadList {
                    head
                } else {
                    Constant::ProtoList(ty, items)
                })
            }
            NullList => {
                let (_, items) = list(fun, &next()?)?;
                Value::bool(items.is_empty())
            }

            // ── Data ──
            ChooseData => {
                let d = next()?;
                let d = data(fun, &d)?;
                let branches = [next()?, next()?, next()?, next()?, next()?];
                let pick = match d {
                    PlutusData::Constr { .. } => 0,
                    PlutusData::Map(_) => 1,
                    PlutusData::List(_) => 2,
                    PlutusData::Integer(_) => 3,
                    PlutusData::Bytes(_) => 4,
                };
                branches
                    .into_iter()
                    .nth(pick)
                    .ok_or(MachineError::BuiltinTermArgumentExpected { fun })?
            }
            ConstrData => {
                let tag = next()?;
                let tag = integer(fun, &tag)?
                    .to_u64()
                    .ok_or_else(|| unexpected(fun, &tag))?;
                let fields = data_list(fun, &next()?)?;
                Value::data(PlutusData::constr(tag, fields))
            }
            MapData => {
                let entries = next()?;
                let (ty, items) = list(fun, &entries)?;
                if ty != Type::pair(Type::Data, Type::Data) {
                    return Err(unexpected(fun, &entries));
                }
                let mut map = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Constant::ProtoPair(_, _, k, v) => match (*k, *v) {
                            (Constant::Data(k), Constant::Data(v)) => map.push((k, v)),
                            _ => return Err(unexpected(fun, &entries)),
                        },
                        _ => return Err(unexpected(fun, &entries)),
                    }
                }
                Value::data(PlutusData::Map(map))
            }
            ListData => Value::data(PlutusData::List(data_list(fun, &next()?)?)),
            IData => Value::data(PlutusData::Integer(integer(fun, &next()?)?)),
            BData => Value::data(PlutusData::Bytes(bytes(fun, &next()?)?)),
            UnConstrData => {
                let d = next()?;
                let PlutusData::Constr { tag, fields } = data(fun, &d)? else {
                    return Err(unexpected(fun, &d));
                };
                Value::con(Constant::pair(
                    Constant::integer(*tag),
                    data_constants(fields),
                ))
            }
            UnMapData => {
                let d = next()?;
                let PlutusData::Map(entries) = data(fun, &d)? else {
                    return Err(unexpected(fun, &d));
                };
                let pairs = entries
                    .iter()
                    .map(|(k, v)| Constant::pair(Constant::Data(k.clone()), Constant::Data(v.clone())))
                    .collect();
                Value::con(Constant::ProtoList(Type::pair(Type::Data, Type::Data), pairs))
            }
            UnListData => {
                let d = next()?;
                let PlutusData::List(items) = data(fun, &d)? else {
                    return Err(unexpected(fun, &d));
                };
                Value::con(data_constants(items))
            }
            UnIData => {
                let d = next()?;
                let PlutusData::Integer(n) = data(fun, &d)? else {
                    return Err(unexpected(fun, &d));
                };
                Value::integer(n.clone())
            }
            UnBData => {
                let d = next()?;
                let PlutusData::Bytes(bs) = data(fun, &d)? else {
                    return Err(unexpected(fun, &d));
                };
                Value::con(Constant::ByteString(bs.clone()))
            }
            EqualsData => {
                let (a, b) = (next()?, next()?);
                Value::bool(data(fun, &a)? == data(fun, &b)?)
            }
            MkPairData => {
                let (a, b) = (next()?, next()?);
                Value::con(Constant::pair(
                    Constant::Data(data(fun, &a)?.clone()),
                    Constant::Data(data(fun, &b)?.clone()),
                ))
            }
            MkNilData | MkNilPairData => {
                unit(fun, &next()?)?;
                let item = if fun == MkNilData {
                    Type::Data
                } else {
                    Type::pair(Type::Data, Type::Data)
                };
                Value::con(Constant::ProtoList(item, Vec::new()))
            }
            SerialiseData => {
                let d = next()?;
                Value::con(Constant::ByteString(data(fun, &d)?.to_cbor()))
            }

            Sha3_256
            | Blake2b_256
            | VerifyEd25519Signature
            | VerifyEcdsaSecp256k1Signature
            | VerifySchnorrSecp256k1Signature => return Err(MachineError::UnsupportedBuiltin(fun)),
        };
        Ok(value)
    }
}

// ─── Arithmetic ────────────────────────────────────────────────────

fn arithmetic(fun: DefaultFunction, a: BigInt, b: BigInt) -> Result<BigInt, MachineError> {
    use DefaultFunction::*;

    let divides = matches!(
        fun,
        DivideInteger | QuotientInteger | RemainderInteger | ModInteger
    );
    if divides && b.is_zero() {
        return Err(MachineError::DivisionByZero { fun });
    }
    Ok(match fun {
        AddInteger => a + b,
        SubtractInteger => a - b,
        MultiplyInteger => a * b,
        QuotientInteger => a / b,
        RemainderInteger => a % b,
        DivideInteger => {
            let (q, r) = (&a / &b, &a % &b);
            if !r.is_zero() && r.sign() != b.sign() {
                q - 1
            } else {
                q
            }
        }
        ModInteger => floor_mod(&a, &b),
        _ => return Err(MachineError::UnsupportedBuiltin(fun)),
    })
}

/// Remainder taking the sign of `b`; `b` is non-zero.
fn floor_mod(a: &BigInt, b: &BigInt) -> BigInt {
    let r = a % b;
    if !r.is_zero() && r.sign() != b.sign() {
        r + b
    } else {
        r
    }
}

/// `take len (drop start bs)` with out-of-range bounds clamped.
fn slice(bs: &[u8], start: &BigInt, len: &BigInt) -> Vec<u8> {
    let clamp = |n: &BigInt| -> usize {
        if n.sign() == Sign::Minus {
            0
        } else {
            n.to_usize().unwrap_or(usize::MAX)
        }
    };
    let from = clamp(start).min(bs.len());
    let to = from.saturating_add(clamp(len)).min(bs.len());
    bs[from..to].to_vec()
}

// ─── Argument extraction ───────────────────────────────────────────

fn unexpected(fun: DefaultFunction, value: &Value<'_>) -> MachineError {
    MachineError::UnexpectedBuiltinArgument {
        fun,
        value: value.to_string(),
    }
}

fn constant<'v>(fun: DefaultFunction, value: &'v Value<'_>) -> Result<&'v Constant, MachineError> {
    value.as_constant().ok_or_else(|| unexpected(fun, value))
}

fn integer(fun: DefaultFunction, value: &Value<'_>) -> Result<BigInt, MachineError> {
    match constant(fun, value)? {
        Constant::Integer(n) => Ok(n.clone()),
        _ => Err(unexpected(fun, value)),
    }
}

fn bytes(fun: DefaultFunction, value: &Value<'_>) -> Result<Vec<u8>, MachineError> {
    match constant(fun, value)? {
        Constant::ByteString(bs) => Ok(bs.clone()),
        _ => Err(unexpected(fun, value)),
    }
}

fn string(fun: DefaultFunction, value: &Value<'_>) -> Result<String, MachineError> {
    match constant(fun, value)? {
        Constant::String(s) => Ok(s.clone()),
        _ => Err(unexpected(fun, value)),
    }
}

fn boolean(fun: DefaultFunction, value: &Value<'_>) -> Result<bool, MachineError> {
    match constant(fun, value)? {
        Constant::Bool(b) => Ok(*b),
        _ => Err(unexpected(fun, value)),
    }
}

fn unit(fun: DefaultFunction, value: &Value<'_>) -> Result<(), MachineError> {
    match constant(fun, value)? {
        Constant::Unit => Ok(()),
        _ => Err(unexpected(fun, value)),
    }
}

fn pair(fun: DefaultFunction, value: &Value<'_>) -> Result<(Constant, Constant), MachineError> {
    match constant(fun, value)? {
        Constant::ProtoPair(_, _, a, b) => Ok(((**a).clone(), (**b).clone())),
        _ => Err(unexpected(fun, value)),
    }
}

fn list(fun: DefaultFunction, value: &Value<'_>) -> Result<(Type, Vec<Constant>), MachineError> {
    match constant(fun, value)? {
        Constant::ProtoList(ty, items) => Ok((ty.clone(), items.clone())),
        _ => Err(unexpected(fun, value)),
    }
}

fn data<'v>(fun: DefaultFunction, value: &'v Value<'_>) -> Result<&'v PlutusData, MachineError> {
    match constant(fun, value)? {
        Constant::Data(d) => Ok(d),
        _ => Err(unexpected(fun, value)),
    }
}

/// Items of a `(list data)` constant.
fn data_list(fun: DefaultFunction, value: &Value<'_>) -> Result<Vec<PlutusData>, MachineError> {
    match constant(fun, value)? {
        Constant::ProtoList(Type::Data, items) => items
            .iter()
            .map(|item| match item {
                Constant::Data(d) => Ok(d.clone()),
                _ => Err(unexpected(fun, value)),
            })
            .collect(),
        _ => Err(unexpected(fun, value)),
    }
}

fn data_constants(items: &[PlutusData]) -> Constant {
    Constant::ProtoList(
        Type::Data,
        items.iter().cloned().map(Constant::Data).collect(),
    )
}

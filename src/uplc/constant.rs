use std::fmt;

use num_bigint::BigInt;

use super::PlutusData;

// ─── Types ─────────────────────────────────────────────────────────

/// Type of a built-in constant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    ByteString,
    String,
    Unit,
    Bool,
    Data,
    List(Box<Type>),
    Pair(Box<Type>, Box<Type>),
}

impl Type {
    pub fn list(item: Type) -> Self {
        Type::List(Box::new(item))
    }

    pub fn pair(fst: Type, snd: Type) -> Self {
        Type::Pair(Box::new(fst), Box::new(snd))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => f.write_str("integer"),
            Type::ByteString => f.write_str("bytestring"),
            Type::String => f.write_str("string"),
            Type::Unit => f.write_str("unit"),
            Type::Bool => f.write_str("bool"),
            Type::Data => f.write_str("data"),
            Type::List(item) => write!(f, "(list {})", item),
            Type::Pair(a, b) => write!(f, "(pair {} {})", a, b),
        }
    }
}

// ─── Constants ─────────────────────────────────────────────────────

/// A built-in constant value.
///
/// Lists and pairs carry their component types so that empty lists keep a
/// type and encoding never needs to infer one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Integer(BigInt),
    ByteString(Vec<u8>),
    String(String),
    Unit,
    Bool(bool),
    Data(PlutusData),
    ProtoList(Type, Vec<Constant>),
    ProtoPair(Type, Type, Box<Constant>, Box<Constant>),
}

impl Constant {
    pub fn integer(value: impl Into<BigInt>) -> Self {
        Constant::Integer(value.into())
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Constant::ByteString(value.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Constant::String(value.into())
    }

    pub fn pair(fst: Constant, snd: Constant) -> Self {
        Constant::ProtoPair(
            fst.type_of(),
            snd.type_of(),
            Box::new(fst),
            Box::new(snd),
        )
    }

    pub fn type_of(&self) -> Type {
        match self {
            Constant::Integer(_) => Type::Integer,
            Constant::ByteString(_) => Type::ByteString,
            Constant::String(_) => Type::String,
            Constant::Unit => Type::Unit,
            Constant::Bool(_) => Type::Bool,
            Constant::Data(_) => Type::Data,
            Constant::ProtoList(item, _) => Type::list(item.clone()),
            Constant::ProtoPair(a, b, _, _) => Type::pair(a.clone(), b.clone()),
        }
    }

    /// Append a canonical, prefix-free byte rendering of this constant.
    ///
    /// Used as the leaf payload for structural hashing.
    pub fn write_canonical(&self, out: &mut Vec<u8>) {
        write_type_canonical(&self.type_of(), out);
        self.write_value_canonical(out);
    }

    fn write_value_canonical(&self, out: &mut Vec<u8>) {
        match self {
            Constant::Integer(n) => {
                let bytes = n.to_signed_bytes_le();
                out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
                out.extend_from_slice(&bytes);
            }
            Constant::ByteString(bytes) => {
                out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
                out.extend_from_slice(bytes);
            }
            Constant::String(s) => {
                out.extend_from_slice(&(s.len() as u64).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Constant::Unit => {}
            Constant::Bool(b) => out.push(*b as u8),
            Constant::Data(d) => {
                let bytes = d.to_cbor();
                out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
                out.extend_from_slice(&bytes);
            }
            Constant::ProtoList(_, items) => {
                out.extend_from_slice(&(items.len() as u64).to_le_bytes());
                for item in items {
                    item.write_value_canonical(out);
                }
            }
            Constant::ProtoPair(_, _, a, b) => {
                a.write_value_canonical(out);
                b.write_value_canonical(out);
            }
        }
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Integer(n) => write!(f, "{}", n),
            Constant::ByteString(bytes) => {
                f.write_str("#")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Constant::String(s) => write!(f, "{:?}", s),
            Constant::Unit => f.write_str("()"),
            Constant::Bool(true) => f.write_str("True"),
            Constant::Bool(false) => f.write_str("False"),
            Constant::Data(d) => write!(f, "({})", d),
            Constant::ProtoList(_, items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_value(f)?;
                }
                f.write_str("]")
            }
            Constant::ProtoPair(_, _, a, b) => {
                f.write_str("(")?;
                a.fmt_value(f)?;
                f.write_str(", ")?;
                b.fmt_value(f)?;
                f.write_str(")")
            }
        }
    }
}

fn write_type_canonical(ty: &Type, out: &mut Vec<u8>) {
    match ty {
        Type::Integer => out.push(0),
        Type::ByteString => out.push(1),
        Type::String => out.push(2),
        Type::Unit => out.push(3),
        Type::Bool => out.push(4),
        Type::Data => out.push(7),
        Type::List(item) => {
            out.push(5);
            write_type_canonical(item, out);
        }
        Type::Pair(a, b) => {
            out.push(6);
            write_type_canonical(a, out);
            write_type_canonical(b, out);
        }
    }
}

/// Renders as `<type> <value>`, the body of a `(con ...)` form.
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.type_of())?;
        self.fmt_value(f)
    }
}

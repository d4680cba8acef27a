//! Plutus `Data`: the structured value type carried by data constants.
//!
//! A `PlutusData` is a tree of constructor applications, maps, lists,
//! integers and byte strings. Its wire form is CBOR (see `cbor`), which is
//! also what the Flat codec embeds and what `serialiseData` returns.
//!
//! Values can be built to any depth at run time (one `constrData` per
//! level), so drop, clone, equality and printing all walk explicit stacks.

mod cbor;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use num_bigint::BigInt;

pub use cbor::CborError;

// ─── Data ──────────────────────────────────────────────────────────

pub enum PlutusData {
    Constr { tag: u64, fields: Vec<PlutusData> },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(BigInt),
    Bytes(Vec<u8>),
}

impl PlutusData {
    pub fn constr(tag: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr { tag, fields }
    }

    pub fn integer(value: impl Into<BigInt>) -> Self {
        PlutusData::Integer(value.into())
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        PlutusData::Bytes(value.into())
    }

    /// Canonical CBOR encoding.
    pub fn to_cbor(&self) -> Vec<u8> {
        cbor::encode(self)
    }

    /// Decode one CBOR item; trailing bytes are an error.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CborError> {
        cbor::decode(bytes)
    }

    fn is_leaf(&self) -> bool {
        matches!(self, PlutusData::Integer(_) | PlutusData::Bytes(_))
    }

    /// Number of immediate children.
    fn arity(&self) -> usize {
        match self {
            PlutusData::Constr { fields: items, .. } | PlutusData::List(items) => items.len(),
            PlutusData::Map(entries) => entries.len() * 2,
            PlutusData::Integer(_) | PlutusData::Bytes(_) => 0,
        }
    }

    /// Immediate children, map entries flattened key first.
    fn children(&self) -> impl DoubleEndedIterator<Item = &PlutusData> {
        let no_items: &[PlutusData] = &[];
        let no_entries: &[(PlutusData, PlutusData)] = &[];
        let (items, entries) = match self {
            PlutusData::Constr { fields: items, .. } | PlutusData::List(items) => {
                (items.as_slice(), no_entries)
            }
            PlutusData::Map(entries) => (no_items, entries.as_slice()),
            PlutusData::Integer(_) | PlutusData::Bytes(_) => (no_items, no_entries),
        };
        items
            .iter()
            .chain(entries.iter().flat_map(|(k, v)| [k, v]))
    }

    /// A copy of `self` with `children` in place of its own.
    fn rebuild(&self, mut children: Vec<PlutusData>) -> PlutusData {
        match self {
            PlutusData::Constr { tag, .. } => PlutusData::constr(*tag, children),
            PlutusData::List(_) => PlutusData::List(children),
            PlutusData::Map(_) => {
                let mut entries = Vec::with_capacity(children.len() / 2);
                let mut rest = children.drain(..);
                while let (Some(k), Some(v)) = (rest.next(), rest.next()) {
                    entries.push((k, v));
                }
                PlutusData::Map(entries)
            }
            PlutusData::Integer(n) => PlutusData::Integer(n.clone()),
            PlutusData::Bytes(b) => PlutusData::Bytes(b.clone()),
        }
    }
}

impl Drop for PlutusData {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        detach_children(self, &mut stack);
        while let Some(mut data) = stack.pop() {
            detach_children(&mut data, &mut stack);
        }
    }
}

/// Move the children of `data` onto `out` unless they are all leaves.
fn detach_children(data: &mut PlutusData, out: &mut Vec<PlutusData>) {
    match data {
        PlutusData::Constr { fields: items, .. } | PlutusData::List(items) => {
            if items.iter().any(|d| !d.is_leaf()) {
                out.append(items);
            }
        }
        PlutusData::Map(entries) => {
            if entries.iter().any(|(k, v)| !k.is_leaf() || !v.is_leaf()) {
                for (k, v) in mem::take(entries) {
                    out.push(k);
                    out.push(v);
                }
            }
        }
        PlutusData::Integer(_) | PlutusData::Bytes(_) => {}
    }
}

impl Clone for PlutusData {
    fn clone(&self) -> Self {
        enum Work<'a> {
            Visit(&'a PlutusData),
            Build(&'a PlutusData),
        }

        let mut work: Vec<Work> = self.children().rev().map(Work::Visit).collect();
        let mut built: Vec<PlutusData> = Vec::new();
        while let Some(item) = work.pop() {
            match item {
                Work::Visit(d) if d.arity() == 0 => built.push(d.rebuild(Vec::new())),
                Work::Visit(d) => {
                    work.push(Work::Build(d));
                    work.extend(d.children().rev().map(Work::Visit));
                }
                Work::Build(d) => {
                    let at = built.len().saturating_sub(d.arity());
                    let children = built.split_off(at);
                    built.push(d.rebuild(children));
                }
            }
        }
        self.rebuild(built)
    }
}

impl PartialEq for PlutusData {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some(pair) = stack.pop() {
            let same_node = match pair {
                (PlutusData::Constr { tag: a, .. }, PlutusData::Constr { tag: b, .. }) => a == b,
                (PlutusData::Map(_), PlutusData::Map(_))
                | (PlutusData::List(_), PlutusData::List(_)) => true,
                (PlutusData::Integer(a), PlutusData::Integer(b)) => a == b,
                (PlutusData::Bytes(a), PlutusData::Bytes(b)) => a == b,
                _ => false,
            };
            let (a, b) = pair;
            if !same_node || a.arity() != b.arity() {
                return false;
            }
            stack.extend(a.children().zip(b.children()));
        }
        true
    }
}

impl Eq for PlutusData {}

/// Hashes the CBOR encoding, which is unique per value.
impl Hash for PlutusData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_cbor().hash(state);
    }
}

/// Textual form: `Constr 0 [I 1, B #ff]`, `Map [(I 1, I 2)]`, `List []`.
impl fmt::Display for PlutusData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Item<'a> {
            Data(&'a PlutusData),
            Text(&'static str),
        }

        fn push_items<'a>(stack: &mut Vec<Item<'a>>, items: &'a [PlutusData]) {
            stack.push(Item::Text("]"));
            for (i, d) in items.iter().enumerate().rev() {
                stack.push(Item::Data(d));
                if i > 0 {
                    stack.push(Item::Text(", "));
                }
            }
        }

        let mut stack = vec![Item::Data(self)];
        while let Some(item) = stack.pop() {
            let data = match item {
                Item::Text(s) => {
                    f.write_str(s)?;
                    continue;
                }
                Item::Data(d) => d,
            };
            match data {
                PlutusData::Integer(n) => write!(f, "I {}", n)?,
                PlutusData::Bytes(bytes) => {
                    f.write_str("B #")?;
                    for b in bytes {
                        write!(f, "{:02x}", b)?;
                    }
                }
                PlutusData::Constr { tag, fields } => {
                    write!(f, "Constr {} [", tag)?;
                    push_items(&mut stack, fields);
                }
                PlutusData::List(items) => {
                    f.write_str("List [")?;
                    push_items(&mut stack, items);
                }
                PlutusData::Map(entries) => {
                    f.write_str("Map [")?;
                    stack.push(Item::Text("]"));
                    for (i, (k, v)) in entries.iter().enumerate().rev() {
                        stack.push(Item::Text(")"));
                        stack.push(Item::Data(v));
                        stack.push(Item::Text(", "));
                        stack.push(Item::Data(k));
                        stack.push(Item::Text("("));
                        if i > 0 {
                            stack.push(Item::Text(", "));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PlutusData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests;

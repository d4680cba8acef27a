//! Structural hashing for IR nodes.
//!
//! Every node's hash is a BLAKE3 digest of its tag, its payload and the
//! hashes of its children, so two structurally identical subtrees hash the
//! same no matter which arena slots hold them. The resolution passes use
//! these hashes, not node ids, to decide which child slot to rewrite.
//!
//! Sharing nodes are grouped by a second digest, the *sharing key*, which
//! hashes a value with its free variables rewritten to absolute binder
//! levels. Two copies of one value placed under different numbers of
//! binders get different structural hashes (their indices differ) but the
//! same sharing key, as long as they refer to the same binder levels.

use super::{IRNode, IRTree, IntegrityError, NodeId};

const HASH_VERSION: u8 = 1;

// ─── Tags ──────────────────────────────────────────────────────────

const TAG_VAR: u8 = 0x01;
const TAG_FUNC: u8 = 0x02;
const TAG_APP: u8 = 0x03;
const TAG_DELAYED: u8 = 0x04;
const TAG_FORCED: u8 = 0x05;
const TAG_LETTED: u8 = 0x06;
const TAG_HOISTED: u8 = 0x07;
const TAG_CONST: u8 = 0x08;
const TAG_BUILTIN: u8 = 0x09;
const TAG_ERROR: u8 = 0x0A;

// Sharing keys only: a variable that escapes the hashed value.
const TAG_FREE_VAR: u8 = 0x81;

// ─── Content Hash ──────────────────────────────────────────────────

/// A 256-bit BLAKE3 content hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Display as full hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Display as short base-32 (8 characters, 40 bits).
    pub fn to_short(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstuvwxyz";
        let val = u64::from_be_bytes([
            0, 0, 0, self.0[0], self.0[1], self.0[2], self.0[3], self.0[4],
        ]);
        let mut result = String::with_capacity(8);
        for i in (0..8).rev() {
            let idx = ((val >> (i * 5)) & 0x1F) as usize;
            result.push(ALPHABET[idx] as char);
        }
        result
    }

    fn from_hasher(hasher: &blake3::Hasher) -> Self {
        ContentHash(*hasher.finalize().as_bytes())
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

// ─── Node hashing ──────────────────────────────────────────────────

/// Hash one node from its payload and its children's current hashes.
pub(crate) fn node_hash(node: &IRNode, child: impl Fn(NodeId) -> ContentHash) -> ContentHash {
    let mut h = blake3::Hasher::new();
    h.update(&[HASH_VERSION]);
    match node {
        IRNode::Var(index) => {
            h.update(&[TAG_VAR]);
            h.update(&index.to_le_bytes());
        }
        IRNode::Func { arity, body } => {
            h.update(&[TAG_FUNC]);
            h.update(&arity.to_le_bytes());
            h.update(&child(*body).0);
        }
        IRNode::App { func, arg } => {
            h.update(&[TAG_APP]);
            h.update(&child(*func).0);
            h.update(&child(*arg).0);
        }
        IRNode::Delayed(term) => {
            h.update(&[TAG_DELAYED]);
            h.update(&child(*term).0);
        }
        IRNode::Forced(term) => {
            h.update(&[TAG_FORCED]);
            h.update(&child(*term).0);
        }
        IRNode::Letted { dbn, value } => {
            h.update(&[TAG_LETTED]);
            h.update(&dbn.to_le_bytes());
            h.update(&child(*value).0);
        }
        IRNode::Hoisted(value) => {
            h.update(&[TAG_HOISTED]);
            h.update(&child(*value).0);
        }
        IRNode::Const(c) => {
            h.update(&[TAG_CONST]);
            let mut buf = Vec::new();
            c.write_canonical(&mut buf);
            h.update(&buf);
        }
        IRNode::Builtin(fun) => {
            h.update(&[TAG_BUILTIN, fun.tag()]);
        }
        IRNode::Error => {
            h.update(&[TAG_ERROR]);
        }
    }
    ContentHash::from_hasher(&h)
}

// ─── Sharing keys ──────────────────────────────────────────────────

/// Identity of a shared value, independent of where a copy of it sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharingKey {
    pub key: ContentHash,
    /// Level of the innermost binder the value refers to from outside
    /// itself; `None` for closed values.
    pub deepest_free_level: Option<u32>,
}

/// Compute the sharing key of `value`, which sits under `depth` binders.
pub fn sharing_key(tree: &IRTree, value: NodeId, depth: u32) -> Result<SharingKey, IntegrityError> {
    let mut h = blake3::Hasher::new();
    h.update(&[HASH_VERSION]);
    let mut deepest: Option<u32> = None;
    let mut stack: Vec<(NodeId, u32)> = vec![(value, 0)];

    while let Some((id, local)) = stack.pop() {
        match tree.node(id) {
            IRNode::Var(index) => {
                if *index < local {
                    h.update(&[TAG_VAR]);
                    h.update(&index.to_le_bytes());
                } else {
                    let level = (depth + local).checked_sub(index + 1).ok_or(
                        IntegrityError::UnboundVariable {
                            index: *index,
                            depth: depth + local,
                        },
                    )?;
                    h.update(&[TAG_FREE_VAR]);
                    h.update(&level.to_le_bytes());
                    deepest = Some(deepest.map_or(level, |d| d.max(level)));
                }
            }
            IRNode::Func { arity, body } => {
                h.update(&[TAG_FUNC]);
                h.update(&arity.to_le_bytes());
                stack.push((*body, local + arity));
            }
            IRNode::App { func, arg } => {
                h.update(&[TAG_APP]);
                stack.push((*arg, local));
                stack.push((*func, local));
            }
            IRNode::Delayed(term) => {
                h.update(&[TAG_DELAYED]);
                stack.push((*term, local));
            }
            IRNode::Forced(term) => {
                h.update(&[TAG_FORCED]);
                stack.push((*term, local));
            }
            IRNode::Letted { value, .. } => {
                // The recorded depth is positional; `local` carries the same
                // information relative to the hashed value.
                h.update(&[TAG_LETTED]);
                stack.push((*value, local));
            }
            IRNode::Hoisted(inner) => {
                h.update(&[TAG_HOISTED]);
                stack.push((*inner, local));
            }
            IRNode::Const(_) | IRNode::Builtin(_) | IRNode::Error => {
                h.update(&tree.hash(id).0);
            }
        }
    }

    Ok(SharingKey {
        key: ContentHash::from_hasher(&h),
        deepest_free_level: deepest,
    })
}

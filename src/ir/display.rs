use std::fmt;

use super::{IRNode, IRTree, NodeId};

/// Borrowed view of one subtree, for printing.
pub struct SubtreeDisplay<'a> {
    tree: &'a IRTree,
    id: NodeId,
}

impl IRTree {
    pub fn display(&self, id: NodeId) -> SubtreeDisplay<'_> {
        SubtreeDisplay { tree: self, id }
    }
}

impl fmt::Display for SubtreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Item {
            Node(NodeId),
            Text(&'static str),
        }

        let mut stack = vec![Item::Node(self.id)];
        while let Some(item) = stack.pop() {
            let id = match item {
                Item::Text(s) => {
                    f.write_str(s)?;
                    continue;
                }
                Item::Node(id) => id,
            };
            match self.tree.node(id) {
                IRNode::Var(i) => write!(f, "(var {})", i)?,
                IRNode::Func { arity, body } => {
                    write!(f, "(func {} ", arity)?;
                    stack.push(Item::Text(")"));
                    stack.push(Item::Node(*body));
                }
                IRNode::App { func, arg } => {
                    f.write_str("[")?;
                    stack.push(Item::Text("]"));
                    stack.push(Item::Node(*arg));
                    stack.push(Item::Text(" "));
                    stack.push(Item::Node(*func));
                }
                IRNode::Delayed(t) => {
                    f.write_str("(delayed ")?;
                    stack.push(Item::Text(")"));
                    stack.push(Item::Node(*t));
                }
                IRNode::Forced(t) => {
                    f.write_str("(forced ")?;
                    stack.push(Item::Text(")"));
                    stack.push(Item::Node(*t));
                }
                IRNode::Letted { dbn, value } => {
                    write!(f, "(letted {} ", dbn)?;
                    stack.push(Item::Text(")"));
                    stack.push(Item::Node(*value));
                }
                IRNode::Hoisted(value) => {
                    f.write_str("(hoisted ")?;
                    stack.push(Item::Text(")"));
                    stack.push(Item::Node(*value));
                }
                IRNode::Const(c) => write!(f, "(con {})", c)?,
                IRNode::Builtin(b) => write!(f, "(builtin {})", b)?,
                IRNode::Error => f.write_str("(error)")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for IRTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root() {
            Some(root) => self.display(root).fmt(f),
            None => f.write_str("<empty>"),
        }
    }
}

use crate::{Path, Value};

/// Comparators a search leaf may use against a field's stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Regexp,
    Lt,
    Gt,
    Lte,
    Gte,
}

/// Boolean combinator for interior condition nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn flipped(self) -> LogicalOp {
        match self {
            LogicalOp::And => LogicalOp::Or,
            LogicalOp::Or => LogicalOp::And,
        }
    }
}

/// A search-condition tree: leaves compare a field's value against a
/// literal; interior nodes combine two conditions with AND/OR. Both kinds
/// carry their own `invert` flag, used by NOT-propagation (`ddb-core`'s
/// condition normalizer) to push negation down to the leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Leaf {
        path: Path,
        comparator: Comparator,
        literal: Value,
        invert: bool,
    },
    Node {
        left: Box<Condition>,
        op: LogicalOp,
        right: Box<Condition>,
        invert: bool,
    },
}

impl Condition {
    pub fn leaf(path: Path, comparator: Comparator, literal: Value) -> Condition {
        Condition::Leaf {
            path,
            comparator,
            literal,
            invert: false,
        }
    }

    pub fn and(self, other: Condition) -> Condition {
        Condition::Node {
            left: Box::new(self),
            op: LogicalOp::And,
            right: Box::new(other),
            invert: false,
        }
    }

    pub fn or(self, other: Condition) -> Condition {
        Condition::Node {
            left: Box::new(self),
            op: LogicalOp::Or,
            right: Box::new(other),
            invert: false,
        }
    }

    pub fn negated(self) -> Condition {
        match self {
            Condition::Leaf {
                path,
                comparator,
                literal,
                invert,
            } => Condition::Leaf {
                path,
                comparator,
                literal,
                invert: !invert,
            },
            Condition::Node {
                left,
                op,
                right,
                invert,
            } => Condition::Node {
                left,
                op,
                right,
                invert: !invert,
            },
        }
    }

    pub fn is_inverted(&self) -> bool {
        match self {
            Condition::Leaf { invert, .. } => *invert,
            Condition::Node { invert, .. } => *invert,
        }
    }
}

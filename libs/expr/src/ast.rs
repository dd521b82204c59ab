//! Abstract syntax tree for the expression sublanguage
//!
//! A single expression, never statements. Nodes that name things carry the
//! character offset of that name for caret diagnostics.

use std::fmt;

/// AST node representing an expression
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    // Literals
    Int(i64),
    /// Narrowed through f32 at parse time: record floats are 32-bit, and
    /// literals must compare at the same precision.
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    Na,

    /// Free identifier: record symbol, constant, namespace, or function name
    Identifier { name: String, offset: usize },

    /// Attribute access: `expression '.' name`
    Attribute {
        object: Box<AstNode>,
        name: String,
        offset: usize,
    },

    /// Index access: `expression '[' expression ']'`
    Index {
        object: Box<AstNode>,
        index: Box<AstNode>,
    },

    /// Call: `expression '(' args ')'`
    Call {
        callee: Box<AstNode>,
        args: Vec<AstNode>,
        offset: usize,
    },

    /// Unary expression: `('+' | '-') expression`
    Unary {
        op: UnaryOp,
        operand: Box<AstNode>,
    },

    /// Binary expression covering arithmetic, comparison, membership, and
    /// identity operators
    Binary {
        left: Box<AstNode>,
        op: BinaryOp,
        right: Box<AstNode>,
    },

    /// Short-circuit boolean expression
    BoolOp {
        op: BoolOpKind,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },

    /// Negation: `'not' expression`
    Not { operand: Box<AstNode> },

    /// Conditional: `then 'if' condition 'else' otherwise`
    Ternary {
        condition: Box<AstNode>,
        then: Box<AstNode>,
        otherwise: Box<AstNode>,
    },

    List(Vec<AstNode>),
    Tuple(Vec<AstNode>),
    Set(Vec<AstNode>),
    Dict(Vec<(AstNode, AstNode)>),

    /// Comprehension: `element 'for' var 'in' iterable ['if' condition]`,
    /// in brackets or as a bare generator argument
    Comprehension {
        element: Box<AstNode>,
        var: String,
        iterable: Box<AstNode>,
        condition: Option<Box<AstNode>>,
    },

    /// Single-parameter lambda: `'lambda' param ':' body`
    Lambda {
        param: String,
        body: Box<AstNode>,
    },
}

/// Unary operator: '+' | '-'
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,  // +
    Minus, // -
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,      // +
    Sub,      // -
    Mul,      // *
    Div,      // /
    FloorDiv, // //
    Mod,      // %
    Pow,      // **

    // Comparison
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
    Eq, // ==
    Ne, // !=

    // Membership
    In,    // in
    NotIn, // not in

    // Identity
    Is,    // is
    IsNot, // is not
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::In
                | BinaryOp::NotIn
                | BinaryOp::Is
                | BinaryOp::IsNot
        )
    }
}

/// Short-circuit boolean operator: 'and' | 'or'
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

impl AstNode {
    /// Replace every free occurrence of `name` with `replacement`.
    ///
    /// Occurrences shadowed by a lambda parameter or comprehension variable
    /// of the same name are left alone. Used to instantiate per-sample
    /// projection columns.
    pub fn substitute(&self, name: &str, replacement: &AstNode) -> AstNode {
        let subst = |node: &AstNode| Box::new(node.substitute(name, replacement));
        match self {
            AstNode::Identifier { name: n, .. } if n == name => replacement.clone(),
            AstNode::Int(_)
            | AstNode::Float(_)
            | AstNode::Str(_)
            | AstNode::Bool(_)
            | AstNode::None
            | AstNode::Na
            | AstNode::Identifier { .. } => self.clone(),
            AstNode::Attribute { object, name: n, offset } => AstNode::Attribute {
                object: subst(object),
                name: n.clone(),
                offset: *offset,
            },
            AstNode::Index { object, index } => AstNode::Index {
                object: subst(object),
                index: subst(index),
            },
            AstNode::Call { callee, args, offset } => AstNode::Call {
                callee: subst(callee),
                args: args.iter().map(|a| a.substitute(name, replacement)).collect(),
                offset: *offset,
            },
            AstNode::Unary { op, operand } => AstNode::Unary {
                op: *op,
                operand: subst(operand),
            },
            AstNode::Binary { left, op, right } => AstNode::Binary {
                left: subst(left),
                op: *op,
                right: subst(right),
            },
            AstNode::BoolOp { op, left, right } => AstNode::BoolOp {
                op: *op,
                left: subst(left),
                right: subst(right),
            },
            AstNode::Not { operand } => AstNode::Not {
                operand: subst(operand),
            },
            AstNode::Ternary {
                condition,
                then,
                otherwise,
            } => AstNode::Ternary {
                condition: subst(condition),
                then: subst(then),
                otherwise: subst(otherwise),
            },
            AstNode::List(items) => {
                AstNode::List(items.iter().map(|i| i.substitute(name, replacement)).collect())
            }
            AstNode::Tuple(items) => {
                AstNode::Tuple(items.iter().map(|i| i.substitute(name, replacement)).collect())
            }
            AstNode::Set(items) => {
                AstNode::Set(items.iter().map(|i| i.substitute(name, replacement)).collect())
            }
            AstNode::Dict(pairs) => AstNode::Dict(
                pairs
                    .iter()
                    .map(|(k, v)| {
                        (k.substitute(name, replacement), v.substitute(name, replacement))
                    })
                    .collect(),
            ),
            AstNode::Comprehension {
                element,
                var,
                iterable,
                condition,
            } => {
                let iterable = subst(iterable);
                if var == name {
                    // the comprehension variable shadows the substitution
                    AstNode::Comprehension {
                        element: element.clone(),
                        var: var.clone(),
                        iterable,
                        condition: condition.clone(),
                    }
                } else {
                    AstNode::Comprehension {
                        element: subst(element),
                        var: var.clone(),
                        iterable,
                        condition: condition.as_deref().map(|c| subst(c)),
                    }
                }
            }
            AstNode::Lambda { param, body } => {
                if param == name {
                    self.clone()
                } else {
                    AstNode::Lambda {
                        param: param.clone(),
                        body: subst(body),
                    }
                }
            }
        }
    }
}

impl fmt::Display for AstNode {
    /// Source-like rendering, used for projection column titles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[AstNode], sep: &str) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            AstNode::Int(v) => write!(f, "{v}"),
            AstNode::Float(v) => write!(f, "{v}"),
            AstNode::Str(v) => write!(f, "'{}'", v.replace('\\', "\\\\").replace('\'', "\\'")),
            AstNode::Bool(true) => f.write_str("True"),
            AstNode::Bool(false) => f.write_str("False"),
            AstNode::None => f.write_str("None"),
            AstNode::Na => f.write_str("NA"),
            AstNode::Identifier { name, .. } => f.write_str(name),
            AstNode::Attribute { object, name, .. } => write!(f, "{object}.{name}"),
            AstNode::Index { object, index } => write!(f, "{object}[{index}]"),
            AstNode::Call { callee, args, .. } => {
                write!(f, "{callee}(")?;
                join(f, args, ", ")?;
                f.write_str(")")
            }
            AstNode::Unary { op, operand } => {
                let symbol = match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                };
                write!(f, "{symbol}{operand}")
            }
            AstNode::Binary { left, op, right } => {
                let symbol = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::FloorDiv => "//",
                    BinaryOp::Mod => "%",
                    BinaryOp::Pow => "**",
                    BinaryOp::Lt => "<",
                    BinaryOp::Le => "<=",
                    BinaryOp::Gt => ">",
                    BinaryOp::Ge => ">=",
                    BinaryOp::Eq => "==",
                    BinaryOp::Ne => "!=",
                    BinaryOp::In => "in",
                    BinaryOp::NotIn => "not in",
                    BinaryOp::Is => "is",
                    BinaryOp::IsNot => "is not",
                };
                write!(f, "{left} {symbol} {right}")
            }
            AstNode::BoolOp { op, left, right } => {
                let symbol = match op {
                    BoolOpKind::And => "and",
                    BoolOpKind::Or => "or",
                };
                write!(f, "{left} {symbol} {right}")
            }
            AstNode::Not { operand } => write!(f, "not {operand}"),
            AstNode::Ternary {
                condition,
                then,
                otherwise,
            } => write!(f, "{then} if {condition} else {otherwise}"),
            AstNode::List(items) => {
                f.write_str("[")?;
                join(f, items, ", ")?;
                f.write_str("]")
            }
            AstNode::Tuple(items) => {
                f.write_str("(")?;
                join(f, items, ", ")?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            AstNode::Set(items) => {
                f.write_str("{")?;
                join(f, items, ", ")?;
                f.write_str("}")
            }
            AstNode::Dict(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            AstNode::Comprehension {
                element,
                var,
                iterable,
                condition,
            } => {
                write!(f, "[{element} for {var} in {iterable}")?;
                if let Some(condition) = condition {
                    write!(f, " if {condition}")?;
                }
                f.write_str("]")
            }
            AstNode::Lambda { param, body } => write!(f, "lambda {param}: {body}"),
        }
    }
}

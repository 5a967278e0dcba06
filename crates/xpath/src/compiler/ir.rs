use crate::functions::CoreFunction;
use crate::model::NodeKind;
use crate::parser::ast::BinaryOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisIR {
    Child,
    Attribute,
    SelfAxis,
    DescendantOrSelf,
    Descendant,
    Parent,
    Ancestor,
    AncestorOrSelf,
    PrecedingSibling,
    FollowingSibling,
    Preceding,
    Following,
}

impl AxisIR {
    /// Reverse axes number their nodes against document order.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Parent | Self::Ancestor | Self::AncestorOrSelf | Self::PrecedingSibling | Self::Preceding
        )
    }

    pub fn principal_node_kind(self) -> NodeKind {
        match self {
            Self::Attribute => NodeKind::Attribute,
            _ => NodeKind::Element,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTestIR {
    AnyKind,                                   // node()
    Name(ExpandedName),                        // QName
    WildcardAny,                               // *
    NsWildcard(String),                        // prefix:* (resolved URI)
    KindText,                                  // text()
    KindComment,                               // comment()
    KindProcessingInstruction(Option<String>), // processing-instruction('target'?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepIR {
    pub axis: AxisIR,
    pub test: NodeTestIR,
    pub predicates: Vec<ExprIR>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathStartIR {
    Root,
    ContextNode,
    Expr(Box<ExprIR>),
}

/// Resolved expression tree: names carry namespace URIs and function calls
/// are bound to the core library.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprIR {
    String(String),
    Number(f64),
    Call { function: CoreFunction, args: Vec<ExprIR> },
    Binary { left: Box<ExprIR>, op: BinaryOp, right: Box<ExprIR> },
    Negate(Box<ExprIR>),
    Union(Box<ExprIR>, Box<ExprIR>),
    Filter { primary: Box<ExprIR>, predicates: Vec<ExprIR> },
    Path { start: PathStartIR, steps: Vec<StepIR> },
}

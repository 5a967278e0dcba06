//! Tree-walking evaluator for compiled XPath expressions.

use crate::compiler::CompiledXPath;
use crate::compiler::ir::{AxisIR, ExprIR, NodeTestIR, PathStartIR, StepIR};
use crate::model::{Document, NodeId, NodeKind};
use crate::parser::ast::BinaryOp;
use crate::runtime::EvalError;
use crate::xdm::XPathValue;
use smallvec::{SmallVec, smallvec};

type NodeBuf = SmallVec<[NodeId; 8]>;

/// Evaluate with the document root as context node.
pub fn evaluate(compiled: &CompiledXPath, doc: &Document) -> Result<XPathValue, EvalError> {
    evaluate_from(compiled, doc, doc.root())
}

pub fn evaluate_from(compiled: &CompiledXPath, doc: &Document, node: NodeId) -> Result<XPathValue, EvalError> {
    Evaluator { doc }.eval(compiled.ir(), &Context { node, position: 1, size: 1 })
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    pub(crate) node: NodeId,
    pub(crate) position: usize,
    pub(crate) size: usize,
}

pub(crate) struct Evaluator<'d> {
    pub(crate) doc: &'d Document,
}

impl Evaluator<'_> {
    pub(crate) fn eval(&self, expr: &ExprIR, ctx: &Context) -> Result<XPathValue, EvalError> {
        match expr {
            ExprIR::String(s) => Ok(XPathValue::String(s.clone())),
            ExprIR::Number(n) => Ok(XPathValue::Number(*n)),
            ExprIR::Call { function, args } => self.call(*function, args, ctx),
            ExprIR::Binary { left, op, right } => self.binary(left, *op, right, ctx),
            ExprIR::Negate(inner) => Ok(XPathValue::Number(-self.eval(inner, ctx)?.to_number(self.doc))),
            ExprIR::Union(left, right) => {
                let mut nodes = self.eval(left, ctx)?.into_node_set("union")?;
                nodes.extend(self.eval(right, ctx)?.into_node_set("union")?);
                Ok(XPathValue::NodeSet(into_document_order(nodes)))
            }
            ExprIR::Filter { primary, predicates } => {
                let nodes = self.eval(primary, ctx)?.into_node_set("predicate")?;
                Ok(XPathValue::NodeSet(self.apply_predicates(nodes, predicates)?))
            }
            ExprIR::Path { start, steps } => self.path(start, steps, ctx),
        }
    }

    fn binary(&self, left: &ExprIR, op: BinaryOp, right: &ExprIR, ctx: &Context) -> Result<XPathValue, EvalError> {
        match op {
            BinaryOp::Or => {
                let value = self.eval(left, ctx)?.to_boolean() || self.eval(right, ctx)?.to_boolean();
                Ok(XPathValue::Boolean(value))
            }
            BinaryOp::And => {
                let value = self.eval(left, ctx)?.to_boolean() && self.eval(right, ctx)?.to_boolean();
                Ok(XPathValue::Boolean(value))
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let l = self.eval(left, ctx)?;
                let r = self.eval(right, ctx)?;
                Ok(XPathValue::Boolean(self.compare(op, &l, &r)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let a = self.eval(left, ctx)?.to_number(self.doc);
                let b = self.eval(right, ctx)?.to_number(self.doc);
                Ok(XPathValue::Number(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => a % b,
                }))
            }
        }
    }

    /// General comparison: node-sets compare existentially over the
    /// string-values of their members.
    fn compare(&self, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
        let doc = self.doc;
        let as_string = |n: NodeId| XPathValue::String(doc.string_value(n));
        match (left, right) {
            (XPathValue::NodeSet(a), XPathValue::NodeSet(b)) => {
                let rights: Vec<XPathValue> = b.iter().map(|&n| as_string(n)).collect();
                a.iter().any(|&n| {
                    let l = as_string(n);
                    rights.iter().any(|r| self.compare_atomic(op, &l, r))
                })
            }
            (XPathValue::NodeSet(_), XPathValue::Boolean(_)) | (XPathValue::Boolean(_), XPathValue::NodeSet(_)) => {
                self.compare_atomic(
                    op,
                    &XPathValue::Boolean(left.to_boolean()),
                    &XPathValue::Boolean(right.to_boolean()),
                )
            }
            (XPathValue::NodeSet(nodes), other) => nodes.iter().any(|&n| self.compare_atomic(op, &as_string(n), other)),
            (other, XPathValue::NodeSet(nodes)) => nodes.iter().any(|&n| self.compare_atomic(op, other, &as_string(n))),
            _ => self.compare_atomic(op, left, right),
        }
    }

    #[allow(clippy::float_cmp)]
    fn compare_atomic(&self, op: BinaryOp, l: &XPathValue, r: &XPathValue) -> bool {
        let doc = self.doc;
        match op {
            BinaryOp::Eq | BinaryOp::Ne => {
                let equal = if matches!(l, XPathValue::Boolean(_)) || matches!(r, XPathValue::Boolean(_)) {
                    l.to_boolean() == r.to_boolean()
                } else if matches!(l, XPathValue::Number(_)) || matches!(r, XPathValue::Number(_)) {
                    l.to_number(doc) == r.to_number(doc)
                } else {
                    l.to_xpath_string(doc) == r.to_xpath_string(doc)
                };
                equal == (op == BinaryOp::Eq)
            }
            _ => {
                let (a, b) = (l.to_number(doc), r.to_number(doc));
                match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::Le => a <= b,
                    BinaryOp::Gt => a > b,
                    BinaryOp::Ge => a >= b,
                    _ => false,
                }
            }
        }
    }

    fn path(&self, start: &PathStartIR, steps: &[StepIR], ctx: &Context) -> Result<XPathValue, EvalError> {
        let mut nodes = match start {
            PathStartIR::Root => vec![self.doc.root()],
            PathStartIR::ContextNode => vec![ctx.node],
            PathStartIR::Expr(expr) => self.eval(expr, ctx)?.into_node_set("path step")?,
        };
        for step in steps {
            nodes = self.step(step, &nodes)?;
        }
        Ok(XPathValue::NodeSet(nodes))
    }

    fn step(&self, step: &StepIR, context_nodes: &[NodeId]) -> Result<Vec<NodeId>, EvalError> {
        let mut out = Vec::new();
        for &node in context_nodes {
            let candidates: Vec<NodeId> = self
                .axis(step.axis, node)
                .into_iter()
                .filter(|&n| self.node_test(&step.test, step.axis, n))
                .collect();
            out.extend(self.apply_predicates(candidates, &step.predicates)?);
        }
        Ok(into_document_order(out))
    }

    /// Filters `nodes` (given in axis order) through each predicate in turn.
    /// A numeric predicate selects by proximity position.
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    fn apply_predicates(&self, mut nodes: Vec<NodeId>, predicates: &[ExprIR]) -> Result<Vec<NodeId>, EvalError> {
        for predicate in predicates {
            let size = nodes.len();
            let mut kept = Vec::with_capacity(size);
            for (index, &node) in nodes.iter().enumerate() {
                let ctx = Context { node, position: index + 1, size };
                let keep = match self.eval(predicate, &ctx)? {
                    XPathValue::Number(n) => (index + 1) as f64 == n,
                    other => other.to_boolean(),
                };
                if keep {
                    kept.push(node);
                }
            }
            nodes = kept;
        }
        Ok(nodes)
    }

    /// Nodes on `axis` from `node`, in axis order (reverse axes nearest first).
    fn axis(&self, axis: AxisIR, node: NodeId) -> NodeBuf {
        let doc = self.doc;
        match axis {
            AxisIR::Child => doc.children(node).iter().copied().collect(),
            AxisIR::Attribute => doc.attributes(node).iter().copied().collect(),
            AxisIR::SelfAxis => smallvec![node],
            AxisIR::Descendant => doc.descendants(node).collect(),
            AxisIR::DescendantOrSelf => core::iter::once(node).chain(doc.descendants(node)).collect(),
            AxisIR::Parent => doc.parent(node).into_iter().collect(),
            AxisIR::Ancestor => doc.ancestors(node).collect(),
            AxisIR::AncestorOrSelf => core::iter::once(node).chain(doc.ancestors(node)).collect(),
            AxisIR::FollowingSibling => {
                let (siblings, pos) = self.siblings(node);
                siblings.get(pos + 1..).unwrap_or_default().iter().copied().collect()
            }
            AxisIR::PrecedingSibling => {
                let (siblings, pos) = self.siblings(node);
                siblings[..pos.min(siblings.len())].iter().rev().copied().collect()
            }
            AxisIR::Following => (doc.subtree_end(node).index() + 1..doc.len())
                .map(NodeId::from_index)
                .filter(|&n| doc.kind(n) != NodeKind::Attribute)
                .collect(),
            AxisIR::Preceding => (0..node.index())
                .rev()
                .map(NodeId::from_index)
                .filter(|&n| doc.kind(n) != NodeKind::Attribute && !doc.is_ancestor_of(n, node))
                .collect(),
        }
    }

    /// The sibling list containing `node` and its position there. Attributes
    /// and the root have no siblings.
    fn siblings(&self, node: NodeId) -> (&[NodeId], usize) {
        let doc = self.doc;
        if doc.kind(node) == NodeKind::Attribute {
            return (&[], 0);
        }
        let Some(parent) = doc.parent(node) else {
            return (&[], 0);
        };
        let siblings = doc.children(parent);
        match siblings.binary_search(&node) {
            Ok(pos) => (siblings, pos),
            Err(_) => (&[], 0),
        }
    }

    fn node_test(&self, test: &NodeTestIR, axis: AxisIR, node: NodeId) -> bool {
        let doc = self.doc;
        let kind = doc.kind(node);
        let principal = kind == axis.principal_node_kind();
        match test {
            NodeTestIR::AnyKind => true,
            NodeTestIR::Name(expected) => {
                principal
                    && doc.name(node).is_some_and(|n| n.matches(&expected.local, expected.ns_uri.as_deref()))
            }
            NodeTestIR::WildcardAny => principal,
            NodeTestIR::NsWildcard(uri) => principal && doc.name(node).is_some_and(|n| n.ns_uri() == Some(uri.as_str())),
            NodeTestIR::KindText => kind == NodeKind::Text,
            NodeTestIR::KindComment => kind == NodeKind::Comment,
            NodeTestIR::KindProcessingInstruction(target) => {
                kind == NodeKind::ProcessingInstruction
                    && target.as_deref().is_none_or(|t| doc.name(node).is_some_and(|n| n.local == t))
            }
        }
    }
}

pub(crate) fn into_document_order(mut nodes: Vec<NodeId>) -> Vec<NodeId> {
    nodes.sort_unstable();
    nodes.dedup();
    nodes
}

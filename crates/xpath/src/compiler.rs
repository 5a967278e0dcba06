use crate::functions::CoreFunction;
use crate::parser::{self, ast};
use crate::runtime::{StaticContext, XPathError};
use core::fmt;
use ir::{AxisIR, ExpandedName, ExprIR, NodeTestIR, PathStartIR, StepIR};

pub mod ir;

/// A parsed, name-resolved XPath expression ready for repeated evaluation.
///
/// Compiled expressions are immutable and hold no reference to any document,
/// so one instance can be evaluated against any number of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledXPath {
    source: String,
    root: ExprIR,
}

impl CompiledXPath {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ir(&self) -> &ExprIR {
        &self.root
    }
}

impl fmt::Display for CompiledXPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile against the default static context (only `xml` bound).
pub fn compile_xpath(source: &str) -> Result<CompiledXPath, XPathError> {
    compile_with_context(source, &StaticContext::default())
}

pub fn compile_with_context(source: &str, ctx: &StaticContext) -> Result<CompiledXPath, XPathError> {
    let ast = parser::parse_xpath(source)?;
    let root = Compiler { ctx }.lower(ast)?;
    tracing::trace!(xpath = source, "compiled xpath expression");
    Ok(CompiledXPath { source: source.to_owned(), root })
}

struct Compiler<'a> {
    ctx: &'a StaticContext,
}

impl Compiler<'_> {
    fn lower(&self, expr: ast::Expr) -> Result<ExprIR, XPathError> {
        use ast::Expr;
        Ok(match expr {
            Expr::Literal(ast::Literal::String(s)) => ExprIR::String(s),
            Expr::Literal(ast::Literal::Number(n)) => ExprIR::Number(n),
            Expr::VarRef(name) => return Err(XPathError::UnboundVariable(name.to_string())),
            Expr::FunctionCall { name, args } => {
                let function = self.function(&name, args.len())?;
                ExprIR::Call { function, args: self.lower_all(args)? }
            }
            Expr::Binary { left, op, right } => fold_binary(self.lower(*left)?, op, self.lower(*right)?),
            Expr::Negate(inner) => match self.lower(*inner)? {
                ExprIR::Number(n) => ExprIR::Number(-n),
                other => ExprIR::Negate(Box::new(other)),
            },
            Expr::Union { left, right } => {
                ExprIR::Union(Box::new(self.lower(*left)?), Box::new(self.lower(*right)?))
            }
            Expr::Filter { primary, predicates } => ExprIR::Filter {
                primary: Box::new(self.lower(*primary)?),
                predicates: self.lower_all(predicates)?,
            },
            Expr::Path(path) => self.lower_path(path)?,
        })
    }

    fn lower_all(&self, exprs: Vec<ast::Expr>) -> Result<Vec<ExprIR>, XPathError> {
        exprs.into_iter().map(|e| self.lower(e)).collect()
    }

    fn function(&self, name: &ast::QName, argc: usize) -> Result<CoreFunction, XPathError> {
        let function = match &name.prefix {
            None => CoreFunction::lookup(&name.local),
            Some(_) => None,
        }
        .ok_or_else(|| XPathError::UnknownFunction { name: name.to_string() })?;
        if !function.accepts(argc) {
            return Err(XPathError::WrongArity {
                name: function.name(),
                expected: function.arity_description(),
                found: argc,
            });
        }
        Ok(function)
    }

    fn lower_path(&self, path: ast::PathExpr) -> Result<ExprIR, XPathError> {
        let start = match path.start {
            ast::PathStart::Root => PathStartIR::Root,
            ast::PathStart::ContextNode => PathStartIR::ContextNode,
            ast::PathStart::Expr(expr) => PathStartIR::Expr(Box::new(self.lower(*expr)?)),
        };
        let steps = path.steps.into_iter().map(|s| self.lower_step(s)).collect::<Result<_, _>>()?;
        Ok(ExprIR::Path { start, steps })
    }

    fn lower_step(&self, step: ast::Step) -> Result<StepIR, XPathError> {
        let axis = lower_axis(step.axis)?;
        let test = match step.test {
            ast::NodeTest::Name(name) => NodeTestIR::Name(ExpandedName {
                ns_uri: name.prefix.as_deref().map(|p| self.namespace(p)).transpose()?,
                local: name.local,
            }),
            ast::NodeTest::Wildcard => NodeTestIR::WildcardAny,
            ast::NodeTest::NsWildcard(prefix) => NodeTestIR::NsWildcard(self.namespace(&prefix)?),
            ast::NodeTest::Kind(ast::KindTest::AnyKind) => NodeTestIR::AnyKind,
            ast::NodeTest::Kind(ast::KindTest::Text) => NodeTestIR::KindText,
            ast::NodeTest::Kind(ast::KindTest::Comment) => NodeTestIR::KindComment,
            ast::NodeTest::Kind(ast::KindTest::ProcessingInstruction(target)) => {
                NodeTestIR::KindProcessingInstruction(target)
            }
        };
        Ok(StepIR { axis, test, predicates: self.lower_all(step.predicates)? })
    }

    fn namespace(&self, prefix: &str) -> Result<String, XPathError> {
        self.ctx
            .resolve_prefix(prefix)
            .map(str::to_owned)
            .ok_or_else(|| XPathError::UnboundPrefix(prefix.to_owned()))
    }
}

fn lower_axis(axis: ast::Axis) -> Result<AxisIR, XPathError> {
    use ast::Axis;
    Ok(match axis {
        Axis::Ancestor => AxisIR::Ancestor,
        Axis::AncestorOrSelf => AxisIR::AncestorOrSelf,
        Axis::Attribute => AxisIR::Attribute,
        Axis::Child => AxisIR::Child,
        Axis::Descendant => AxisIR::Descendant,
        Axis::DescendantOrSelf => AxisIR::DescendantOrSelf,
        Axis::Following => AxisIR::Following,
        Axis::FollowingSibling => AxisIR::FollowingSibling,
        Axis::Parent => AxisIR::Parent,
        Axis::Preceding => AxisIR::Preceding,
        Axis::PrecedingSibling => AxisIR::PrecedingSibling,
        Axis::SelfAxis => AxisIR::SelfAxis,
        Axis::Namespace => return Err(XPathError::UnsupportedAxis("namespace")),
    })
}

/// Arithmetic on two numeric literals is folded at compile time.
fn fold_binary(left: ExprIR, op: ast::BinaryOp, right: ExprIR) -> ExprIR {
    use ast::BinaryOp;
    if let (ExprIR::Number(a), ExprIR::Number(b)) = (&left, &right) {
        let folded = match op {
            BinaryOp::Add => Some(a + b),
            BinaryOp::Sub => Some(a - b),
            BinaryOp::Mul => Some(a * b),
            BinaryOp::Div => Some(a / b),
            BinaryOp::Mod => Some(a % b),
            _ => None,
        };
        if let Some(value) = folded {
            return ExprIR::Number(value);
        }
    }
    ExprIR::Binary { left: Box::new(left), op, right: Box::new(right) }
}

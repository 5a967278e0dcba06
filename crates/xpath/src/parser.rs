use crate::runtime::XPathError;
use ast::{Axis, BinaryOp, Expr, KindTest, Literal, NodeTest, PathExpr, PathStart, QName, Step};
use pest::Parser;
use pest::iterators::{Pair, Pairs};

pub mod ast;

#[derive(pest_derive::Parser)]
#[grammar = "xpath1.pest"]
pub struct XPathParser;

/// Parse an XPath 1.0 expression into its AST.
pub fn parse_xpath(input: &str) -> Result<Expr, XPathError> {
    XPathParser::parse_to_ast(input)
}

impl XPathParser {
    pub fn parse_to_ast(input: &str) -> Result<Expr, XPathError> {
        let mut pairs = Self::parse(Rule::xpath, input)?;
        let root = next(&mut pairs, Rule::xpath)?;
        build_expr(next(&mut root.into_inner(), Rule::xpath)?)
    }
}

fn next<'i>(pairs: &mut Pairs<'i, Rule>, parent: Rule) -> Result<Pair<'i, Rule>, XPathError> {
    pairs.next().ok_or_else(|| XPathError::Internal(format!("missing child of {parent:?}")))
}

fn unexpected(rule: Rule) -> XPathError {
    XPathError::Internal(format!("unexpected {rule:?}"))
}

/// Walk down a pair to the first terminal token rule (e.g. `OP_PLUS`, `K_AND`).
fn first_token_rule(pair: &Pair<'_, Rule>) -> Rule {
    let mut current = pair.clone();
    while let Some(inner) = current.clone().into_inner().next() {
        current = inner;
    }
    current.as_rule()
}

fn build_expr(pair: Pair<'_, Rule>) -> Result<Expr, XPathError> {
    let rule = pair.as_rule();
    match rule {
        Rule::expr | Rule::primary_expr | Rule::parenthesized_expr => {
            build_expr(next(&mut pair.into_inner(), rule)?)
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality_expr
        | Rule::relational_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => fold_binary(pair),
        Rule::unary_expr => build_unary(pair),
        Rule::union_expr => build_union(pair),
        Rule::path_expr => build_path_expr(pair),
        Rule::filter_expr => build_filter(pair),
        Rule::location_path => build_location_path(pair),
        Rule::var_ref => {
            let name = next(&mut pair.into_inner(), rule)?;
            Ok(Expr::VarRef(QName::parse(name.as_str())))
        }
        Rule::string_literal => {
            let text = pair.into_inner().next().map(|p| p.as_str().to_owned()).unwrap_or_default();
            Ok(Expr::Literal(Literal::String(text)))
        }
        Rule::number_literal => {
            let value = pair
                .as_str()
                .parse::<f64>()
                .map_err(|err| XPathError::Internal(format!("number literal {}: {err}", pair.as_str())))?;
            Ok(Expr::Literal(Literal::Number(value)))
        }
        Rule::function_call => {
            let mut inner = pair.into_inner();
            let name = QName::parse(next(&mut inner, rule)?.as_str());
            let args = inner.map(build_expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::FunctionCall { name, args })
        }
        other => Err(unexpected(other)),
    }
}

fn fold_binary(pair: Pair<'_, Rule>) -> Result<Expr, XPathError> {
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();
    let mut expr = build_expr(next(&mut inner, rule)?)?;
    while let Some(op) = inner.next() {
        let op = binary_op(&op)?;
        let right = build_expr(next(&mut inner, rule)?)?;
        expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
    }
    Ok(expr)
}

fn binary_op(pair: &Pair<'_, Rule>) -> Result<BinaryOp, XPathError> {
    Ok(match first_token_rule(pair) {
        Rule::K_OR => BinaryOp::Or,
        Rule::K_AND => BinaryOp::And,
        Rule::OP_EQ => BinaryOp::Eq,
        Rule::OP_NE => BinaryOp::Ne,
        Rule::OP_LT => BinaryOp::Lt,
        Rule::OP_LTE => BinaryOp::Le,
        Rule::OP_GT => BinaryOp::Gt,
        Rule::OP_GTE => BinaryOp::Ge,
        Rule::OP_PLUS => BinaryOp::Add,
        Rule::OP_MINUS => BinaryOp::Sub,
        Rule::OP_MUL => BinaryOp::Mul,
        Rule::K_DIV => BinaryOp::Div,
        Rule::K_MOD => BinaryOp::Mod,
        other => return Err(unexpected(other)),
    })
}

fn build_unary(pair: Pair<'_, Rule>) -> Result<Expr, XPathError> {
    let mut negations = 0usize;
    let mut operand = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::OP_NEG => negations += 1,
            _ => operand = Some(build_expr(p)?),
        }
    }
    let mut expr = operand.ok_or_else(|| XPathError::Internal("unary expression without operand".into()))?;
    for _ in 0..negations {
        expr = Expr::Negate(Box::new(expr));
    }
    Ok(expr)
}

fn build_union(pair: Pair<'_, Rule>) -> Result<Expr, XPathError> {
    let mut operands = pair.into_inner().filter(|p| p.as_rule() != Rule::OP_PIPE);
    let first = operands.next().ok_or_else(|| XPathError::Internal("empty union".into()))?;
    let mut expr = build_expr(first)?;
    for p in operands {
        expr = Expr::Union { left: Box::new(expr), right: Box::new(build_expr(p)?) };
    }
    Ok(expr)
}

fn build_filter(pair: Pair<'_, Rule>) -> Result<Expr, XPathError> {
    let mut inner = pair.into_inner();
    let primary = build_expr(next(&mut inner, Rule::filter_expr)?)?;
    let predicates = inner.map(build_predicate).collect::<Result<Vec<_>, _>>()?;
    if predicates.is_empty() {
        Ok(primary)
    } else {
        Ok(Expr::Filter { primary: Box::new(primary), predicates })
    }
}

fn build_predicate(pair: Pair<'_, Rule>) -> Result<Expr, XPathError> {
    match pair.as_rule() {
        Rule::predicate => build_expr(next(&mut pair.into_inner(), Rule::predicate)?),
        other => Err(unexpected(other)),
    }
}

fn build_path_expr(pair: Pair<'_, Rule>) -> Result<Expr, XPathError> {
    let mut inner = pair.into_inner();
    let first = next(&mut inner, Rule::path_expr)?;
    if first.as_rule() == Rule::location_path {
        return build_location_path(first);
    }
    let filter = build_filter(first)?;
    let Some(separator) = inner.next() else {
        return Ok(filter);
    };
    let mut steps = Vec::new();
    if first_token_rule(&separator) == Rule::OP_DSLASH {
        steps.push(Step::descendant_or_self());
    }
    build_relative_steps(next(&mut inner, Rule::path_expr)?, &mut steps)?;
    Ok(Expr::Path(PathExpr { start: PathStart::Expr(Box::new(filter)), steps }))
}

fn build_location_path(pair: Pair<'_, Rule>) -> Result<Expr, XPathError> {
    let path = next(&mut pair.into_inner(), Rule::location_path)?;
    let mut steps = Vec::new();
    match path.as_rule() {
        Rule::relative_location_path => {
            build_relative_steps(path, &mut steps)?;
            Ok(Expr::Path(PathExpr { start: PathStart::ContextNode, steps }))
        }
        Rule::absolute_location_path => {
            let mut inner = path.into_inner();
            if next(&mut inner, Rule::absolute_location_path)?.as_rule() == Rule::OP_DSLASH {
                steps.push(Step::descendant_or_self());
            }
            if let Some(relative) = inner.next() {
                build_relative_steps(relative, &mut steps)?;
            }
            Ok(Expr::Path(PathExpr { start: PathStart::Root, steps }))
        }
        other => Err(unexpected(other)),
    }
}

fn build_relative_steps(pair: Pair<'_, Rule>, steps: &mut Vec<Step>) -> Result<(), XPathError> {
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::step => steps.push(build_step(p)?),
            Rule::path_sep => {
                if first_token_rule(&p) == Rule::OP_DSLASH {
                    steps.push(Step::descendant_or_self());
                }
            }
            other => return Err(unexpected(other)),
        }
    }
    Ok(())
}

fn build_step(pair: Pair<'_, Rule>) -> Result<Step, XPathError> {
    let mut axis = Axis::Child;
    let mut test = None;
    let mut predicates = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::abbrev_parent => {
                return Ok(Step { axis: Axis::Parent, test: NodeTest::Kind(KindTest::AnyKind), predicates });
            }
            Rule::abbrev_self => {
                return Ok(Step { axis: Axis::SelfAxis, test: NodeTest::Kind(KindTest::AnyKind), predicates });
            }
            Rule::axis_specifier => axis = build_axis(p)?,
            Rule::node_test => test = Some(build_node_test(p)?),
            Rule::predicate => predicates.push(build_predicate(p)?),
            other => return Err(unexpected(other)),
        }
    }
    let test = test.ok_or_else(|| XPathError::Internal("step without node test".into()))?;
    Ok(Step { axis, test, predicates })
}

fn build_axis(pair: Pair<'_, Rule>) -> Result<Axis, XPathError> {
    let inner = next(&mut pair.into_inner(), Rule::axis_specifier)?;
    match inner.as_rule() {
        Rule::abbrev_attribute => Ok(Axis::Attribute),
        Rule::axis_name => Axis::from_name(inner.as_str())
            .ok_or_else(|| XPathError::Internal(format!("unknown axis {}", inner.as_str()))),
        other => Err(unexpected(other)),
    }
}

fn build_node_test(pair: Pair<'_, Rule>) -> Result<NodeTest, XPathError> {
    let test = next(&mut pair.into_inner(), Rule::node_test)?;
    let inner = next(&mut test.clone().into_inner(), test.as_rule())?;
    match inner.as_rule() {
        Rule::pi_test => {
            let target = inner
                .into_inner()
                .next()
                .and_then(|literal| literal.into_inner().next())
                .map(|content| content.as_str().to_owned());
            Ok(NodeTest::Kind(KindTest::ProcessingInstruction(target)))
        }
        Rule::node_type => Ok(NodeTest::Kind(match inner.as_str() {
            "comment" => KindTest::Comment,
            "text" => KindTest::Text,
            _ => KindTest::AnyKind,
        })),
        Rule::wildcard => Ok(NodeTest::Wildcard),
        Rule::ns_wildcard => {
            let prefix = next(&mut inner.into_inner(), Rule::ns_wildcard)?;
            Ok(NodeTest::NsWildcard(prefix.as_str().to_owned()))
        }
        Rule::qname => Ok(NodeTest::Name(QName::parse(inner.as_str()))),
        other => Err(unexpected(other)),
    }
}

//! The XPath 1.0 core function library.

use crate::compiler::ir::ExprIR;
use crate::evaluator::{Context, Evaluator};
use crate::model::{NodeId, NodeKind, XML_NS_URI, XmlName};
use crate::runtime::EvalError;
use crate::xdm::{XPathValue, string_to_number};
use itertools::Itertools;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreFunction {
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl CoreFunction {
    pub const ALL: [Self; 27] = [
        Self::Last,
        Self::Position,
        Self::Count,
        Self::Id,
        Self::LocalName,
        Self::NamespaceUri,
        Self::Name,
        Self::String,
        Self::Concat,
        Self::StartsWith,
        Self::Contains,
        Self::SubstringBefore,
        Self::SubstringAfter,
        Self::Substring,
        Self::StringLength,
        Self::NormalizeSpace,
        Self::Translate,
        Self::Boolean,
        Self::Not,
        Self::True,
        Self::False,
        Self::Lang,
        Self::Number,
        Self::Sum,
        Self::Floor,
        Self::Ceiling,
        Self::Round,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Position => "position",
            Self::Count => "count",
            Self::Id => "id",
            Self::LocalName => "local-name",
            Self::NamespaceUri => "namespace-uri",
            Self::Name => "name",
            Self::String => "string",
            Self::Concat => "concat",
            Self::StartsWith => "starts-with",
            Self::Contains => "contains",
            Self::SubstringBefore => "substring-before",
            Self::SubstringAfter => "substring-after",
            Self::Substring => "substring",
            Self::StringLength => "string-length",
            Self::NormalizeSpace => "normalize-space",
            Self::Translate => "translate",
            Self::Boolean => "boolean",
            Self::Not => "not",
            Self::True => "true",
            Self::False => "false",
            Self::Lang => "lang",
            Self::Number => "number",
            Self::Sum => "sum",
            Self::Floor => "floor",
            Self::Ceiling => "ceiling",
            Self::Round => "round",
        }
    }

    /// Minimum and (if bounded) maximum argument count.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Last | Self::Position | Self::True | Self::False => (0, Some(0)),
            Self::LocalName
            | Self::NamespaceUri
            | Self::Name
            | Self::String
            | Self::StringLength
            | Self::NormalizeSpace
            | Self::Number => (0, Some(1)),
            Self::Count
            | Self::Id
            | Self::Boolean
            | Self::Not
            | Self::Lang
            | Self::Sum
            | Self::Floor
            | Self::Ceiling
            | Self::Round => (1, Some(1)),
            Self::StartsWith | Self::Contains | Self::SubstringBefore | Self::SubstringAfter => (2, Some(2)),
            Self::Substring => (2, Some(3)),
            Self::Translate => (3, Some(3)),
            Self::Concat => (2, None),
        }
    }

    pub fn accepts(self, argc: usize) -> bool {
        let (min, max) = self.arity();
        argc >= min && max.is_none_or(|max| argc <= max)
    }

    pub fn arity_description(self) -> String {
        match self.arity() {
            (min, Some(max)) if min == max => min.to_string(),
            (min, Some(max)) => format!("{min} to {max}"),
            (min, None) => format!("at least {min}"),
        }
    }
}

impl Evaluator<'_> {
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn call(
        &self,
        function: CoreFunction,
        args: &[ExprIR],
        ctx: &Context,
    ) -> Result<XPathValue, EvalError> {
        use CoreFunction as F;
        let doc = self.doc;
        Ok(match function {
            F::Last => XPathValue::Number(ctx.size as f64),
            F::Position => XPathValue::Number(ctx.position as f64),
            F::Count => XPathValue::Number(self.node_set_arg(function, args, 0, ctx)?.len() as f64),
            F::Id => XPathValue::NodeSet(self.id(function, args, ctx)?),
            F::LocalName => XPathValue::String(
                self.name_of(function, args, ctx)?.map(|n| n.local.to_string()).unwrap_or_default(),
            ),
            F::NamespaceUri => XPathValue::String(
                self.name_of(function, args, ctx)?.and_then(XmlName::ns_uri).unwrap_or_default().to_owned(),
            ),
            F::Name => {
                XPathValue::String(self.name_of(function, args, ctx)?.map(ToString::to_string).unwrap_or_default())
            }
            F::String => XPathValue::String(self.string_or_context(args, ctx)?),
            F::Concat => {
                let mut out = String::new();
                for arg in args {
                    out.push_str(&self.eval(arg, ctx)?.to_xpath_string(doc));
                }
                XPathValue::String(out)
            }
            F::StartsWith => {
                let (s, prefix) = self.two_strings(function, args, ctx)?;
                XPathValue::Boolean(s.starts_with(&prefix))
            }
            F::Contains => {
                let (s, needle) = self.two_strings(function, args, ctx)?;
                XPathValue::Boolean(s.contains(&needle))
            }
            F::SubstringBefore => {
                let (s, needle) = self.two_strings(function, args, ctx)?;
                XPathValue::String(s.find(&needle).map(|i| s[..i].to_owned()).unwrap_or_default())
            }
            F::SubstringAfter => {
                let (s, needle) = self.two_strings(function, args, ctx)?;
                XPathValue::String(s.find(&needle).map(|i| s[i + needle.len()..].to_owned()).unwrap_or_default())
            }
            F::Substring => {
                let s = self.string_arg(function, args, 0, ctx)?;
                let start = self.number_arg(function, args, 1, ctx)?;
                let length = match args.get(2) {
                    Some(arg) => Some(self.eval(arg, ctx)?.to_number(doc)),
                    None => None,
                };
                XPathValue::String(substring(&s, start, length))
            }
            F::StringLength => XPathValue::Number(self.string_or_context(args, ctx)?.chars().count() as f64),
            F::NormalizeSpace => XPathValue::String(normalize_space(&self.string_or_context(args, ctx)?)),
            F::Translate => {
                let s = self.string_arg(function, args, 0, ctx)?;
                let from = self.string_arg(function, args, 1, ctx)?;
                let to = self.string_arg(function, args, 2, ctx)?;
                XPathValue::String(translate(&s, &from, &to))
            }
            F::Boolean => XPathValue::Boolean(self.eval(arg(function, args, 0)?, ctx)?.to_boolean()),
            F::Not => XPathValue::Boolean(!self.eval(arg(function, args, 0)?, ctx)?.to_boolean()),
            F::True => XPathValue::Boolean(true),
            F::False => XPathValue::Boolean(false),
            F::Lang => XPathValue::Boolean(self.lang(&self.string_arg(function, args, 0, ctx)?, ctx.node)),
            F::Number => XPathValue::Number(match args.first() {
                Some(arg) => self.eval(arg, ctx)?.to_number(doc),
                None => string_to_number(&doc.string_value(ctx.node)),
            }),
            F::Sum => XPathValue::Number(
                self.node_set_arg(function, args, 0, ctx)?
                    .iter()
                    .map(|&n| string_to_number(&doc.string_value(n)))
                    .sum(),
            ),
            F::Floor => XPathValue::Number(self.number_arg(function, args, 0, ctx)?.floor()),
            F::Ceiling => XPathValue::Number(self.number_arg(function, args, 0, ctx)?.ceil()),
            F::Round => XPathValue::Number(round(self.number_arg(function, args, 0, ctx)?)),
        })
    }

    fn node_set_arg(
        &self,
        function: CoreFunction,
        args: &[ExprIR],
        index: usize,
        ctx: &Context,
    ) -> Result<Vec<NodeId>, EvalError> {
        self.eval(arg(function, args, index)?, ctx)?.into_node_set(function.name())
    }

    fn string_arg(
        &self,
        function: CoreFunction,
        args: &[ExprIR],
        index: usize,
        ctx: &Context,
    ) -> Result<String, EvalError> {
        Ok(self.eval(arg(function, args, index)?, ctx)?.to_xpath_string(self.doc))
    }

    fn number_arg(&self, function: CoreFunction, args: &[ExprIR], index: usize, ctx: &Context) -> Result<f64, EvalError> {
        Ok(self.eval(arg(function, args, index)?, ctx)?.to_number(self.doc))
    }

    fn two_strings(
        &self,
        function: CoreFunction,
        args: &[ExprIR],
        ctx: &Context,
    ) -> Result<(String, String), EvalError> {
        Ok((self.string_arg(function, args, 0, ctx)?, self.string_arg(function, args, 1, ctx)?))
    }

    /// The optional argument's string value, or the context node's.
    fn string_or_context(&self, args: &[ExprIR], ctx: &Context) -> Result<String, EvalError> {
        match args.first() {
            Some(arg) => Ok(self.eval(arg, ctx)?.to_xpath_string(self.doc)),
            None => Ok(self.doc.string_value(ctx.node)),
        }
    }

    /// Name of the first node of the optional node-set argument, or of the
    /// context node.
    fn name_of(&self, function: CoreFunction, args: &[ExprIR], ctx: &Context) -> Result<Option<&XmlName>, EvalError> {
        let node = match args.first() {
            Some(arg) => self.eval(arg, ctx)?.into_node_set(function.name())?.first().copied(),
            None => Some(ctx.node),
        };
        Ok(node.and_then(|n| self.doc.name(n)))
    }

    /// Elements whose `xml:id` matches any whitespace-separated token of the
    /// argument. Node-set arguments contribute the tokens of every member.
    fn id(&self, function: CoreFunction, args: &[ExprIR], ctx: &Context) -> Result<Vec<NodeId>, EvalError> {
        let doc = self.doc;
        let tokens: Vec<String> = match self.eval(arg(function, args, 0)?, ctx)? {
            XPathValue::NodeSet(nodes) => {
                nodes.iter().flat_map(|&n| xml_tokens(&doc.string_value(n)).collect::<Vec<_>>()).collect()
            }
            other => xml_tokens(&other.to_xpath_string(doc)).collect(),
        };
        Ok(doc
            .iter()
            .filter(|&n| {
                doc.kind(n) == NodeKind::Element
                    && doc.attribute(n, "id", Some(XML_NS_URI)).is_some_and(|id| tokens.iter().any(|t| t == id))
            })
            .collect())
    }

    /// `xml:lang` of the nearest element, matched case-insensitively with
    /// sublanguage suffixes allowed.
    fn lang(&self, wanted: &str, node: NodeId) -> bool {
        let doc = self.doc;
        let lang = core::iter::once(node).chain(doc.ancestors(node)).find_map(|n| {
            if doc.kind(n) == NodeKind::Element { doc.attribute(n, "lang", Some(XML_NS_URI)) } else { None }
        });
        lang.is_some_and(|lang| {
            let lang = lang.to_ascii_lowercase();
            let wanted = wanted.to_ascii_lowercase();
            lang == wanted || lang.strip_prefix(&wanted).is_some_and(|rest| rest.starts_with('-'))
        })
    }
}

fn arg(function: CoreFunction, args: &[ExprIR], index: usize) -> Result<&ExprIR, EvalError> {
    args.get(index).ok_or(EvalError::MissingArgument { function: function.name(), index })
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn xml_tokens(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(is_xml_space).filter(|t| !t.is_empty()).map(str::to_owned)
}

fn normalize_space(s: &str) -> String {
    s.split(is_xml_space).filter(|t| !t.is_empty()).join(" ")
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let mut table: HashMap<char, Option<char>> = HashMap::new();
    let mut replacements = to.chars();
    for c in from.chars() {
        let replacement = replacements.next();
        if let Entry::Vacant(e) = table.entry(c) {
            e.insert(replacement);
        }
    }
    s.chars()
        .filter_map(|c| match table.get(&c) {
            Some(mapped) => *mapped,
            None => Some(c),
        })
        .collect()
}

/// Characters at 1-based positions `p` with `round(start) <= p < round(start) + round(length)`.
#[allow(clippy::cast_precision_loss)]
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = length.map_or(f64::INFINITY, |len| first + round(len));
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let position = (*i + 1) as f64;
            position >= first && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

/// Round half towards positive infinity, keeping the sign of zero.
fn round(x: f64) -> f64 {
    if x.is_nan() || x.is_infinite() || x == 0.0 {
        x
    } else if (-0.5..0.0).contains(&x) {
        -0.0
    } else {
        (x + 0.5).floor()
    }
}

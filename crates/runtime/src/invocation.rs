use pest::Parser;
use pest::error::LineColLocation;
use wrangler_core::{Arguments, DirectiveParseError, Token, UsageDefinition};

#[derive(pest_derive::Parser)]
#[grammar = "invocation.pest"]
struct InvocationParser;

/// Parses one invocation line such as `extract-xpath '/a/b' :body :b` and
/// binds its positional arguments to the parameters of `usage`.
pub fn parse_invocation(text: &str, usage: &UsageDefinition) -> Result<Arguments, DirectiveParseError> {
    let directive = usage.directive();
    let invocation = InvocationParser::parse(Rule::invocation, text)
        .map_err(|err| syntax_error(directive, &err))?
        .next()
        .ok_or_else(|| DirectiveParseError::Syntax {
            directive: directive.to_owned(),
            line: 1,
            column: 1,
            message: "empty invocation".to_owned(),
        })?;

    let mut name = None;
    let mut tokens = Vec::new();
    for pair in invocation.into_inner() {
        match pair.as_rule() {
            Rule::directive_name => name = Some(pair.as_str()),
            Rule::text => tokens.push(Token::Text(unescape(pair.into_inner().as_str()))),
            Rule::column => tokens.push(Token::ColumnName(pair.into_inner().as_str().to_owned())),
            _ => {}
        }
    }
    let name = name.unwrap_or_default();
    if name != directive {
        return Err(DirectiveParseError::NameMismatch { expected: directive.to_owned(), found: name.to_owned() });
    }

    let parameters = usage.parameters();
    if tokens.len() > parameters.len() {
        return Err(DirectiveParseError::TooManyArguments {
            directive: directive.to_owned(),
            max: parameters.len(),
            found: tokens.len(),
        });
    }

    let mut tokens = tokens.into_iter();
    let mut args = Arguments::builder(directive);
    for parameter in parameters {
        match tokens.next() {
            Some(token) if token.token_type() != parameter.token_type => {
                return Err(DirectiveParseError::WrongTokenType {
                    directive: directive.to_owned(),
                    parameter: parameter.name.clone(),
                    expected: parameter.token_type,
                    found: token.token_type(),
                });
            }
            Some(token) => args = args.token(parameter.name.as_str(), token),
            None if parameter.optional => {}
            None => {
                return Err(DirectiveParseError::MissingArgument {
                    directive: directive.to_owned(),
                    parameter: parameter.name.clone(),
                });
            }
        }
    }
    Ok(args.build())
}

fn syntax_error(directive: &str, err: &pest::error::Error<Rule>) -> DirectiveParseError {
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) | LineColLocation::Span(pos, _) => pos,
    };
    DirectiveParseError::Syntax {
        directive: directive.to_owned(),
        line,
        column,
        message: err.variant.message().into_owned(),
    }
}

/// Resolves `\n`, `\t`, `\\` and escaped quotes. Other escapes are kept as
/// written so regular-expression and query text passes through untouched.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(escaped @ ('\\' | '\'' | '"')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

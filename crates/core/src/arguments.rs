use crate::error::DirectiveParseError;
use crate::usage::TokenType;

/// A parsed invocation argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    ColumnName(String),
}

impl Token {
    pub fn token_type(&self) -> TokenType {
        match self {
            Self::Text(_) => TokenType::Text,
            Self::ColumnName(_) => TokenType::ColumnName,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Text(v) | Self::ColumnName(v) => v,
        }
    }
}

/// Named, typed arguments of one directive invocation, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arguments {
    directive: String,
    tokens: Vec<(String, Token)>,
}

impl Arguments {
    pub fn builder(directive: impl Into<String>) -> ArgumentsBuilder {
        ArgumentsBuilder { args: Self { directive: directive.into(), tokens: Vec::new() } }
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn get(&self, name: &str) -> Option<&Token> {
        self.tokens.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Token)> {
        self.tokens.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Value of a required `Text` argument.
    pub fn text(&self, name: &str) -> Result<&str, DirectiveParseError> {
        self.typed(name, TokenType::Text)
    }

    /// Value of a required `ColumnName` argument.
    pub fn column(&self, name: &str) -> Result<&str, DirectiveParseError> {
        self.typed(name, TokenType::ColumnName)
    }

    fn typed(&self, name: &str, expected: TokenType) -> Result<&str, DirectiveParseError> {
        let token = self.get(name).ok_or_else(|| DirectiveParseError::MissingArgument {
            directive: self.directive.clone(),
            parameter: name.to_owned(),
        })?;
        if token.token_type() != expected {
            return Err(DirectiveParseError::WrongTokenType {
                directive: self.directive.clone(),
                parameter: name.to_owned(),
                expected,
                found: token.token_type(),
            });
        }
        Ok(token.value())
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentsBuilder {
    args: Arguments,
}

impl ArgumentsBuilder {
    /// Adds or replaces the argument called `name`.
    pub fn token(mut self, name: impl Into<String>, token: Token) -> Self {
        let name = name.into();
        match self.args.tokens.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = token,
            None => self.args.tokens.push((name, token)),
        }
        self
    }

    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.token(name, Token::Text(value.into()))
    }

    pub fn column(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.token(name, Token::ColumnName(value.into()))
    }

    pub fn build(self) -> Arguments {
        self.args
    }
}

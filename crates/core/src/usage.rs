use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of token a directive parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Quoted string literal.
    Text,
    /// Reference to a row field, written `:name`.
    ColumnName,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::ColumnName => "column name",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub token_type: TokenType,
    #[serde(default)]
    pub optional: bool,
}

/// Positional argument schema of a directive.
///
/// Parameters are matched in declaration order. Optional parameters may only
/// follow required ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDefinition {
    directive: String,
    parameters: Vec<ParameterDefinition>,
}

impl UsageDefinition {
    pub fn builder(directive: impl Into<String>) -> UsageDefinitionBuilder {
        UsageDefinitionBuilder { directive: directive.into(), parameters: Vec::new() }
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.optional).count()
    }
}

/// Renders the invocation shape, e.g. `extract-xpath '<xpath>' :<source>`.
impl fmt::Display for UsageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.directive)?;
        for p in &self.parameters {
            let token = match p.token_type {
                TokenType::Text => format!("'<{}>'", p.name),
                TokenType::ColumnName => format!(":<{}>", p.name),
            };
            if p.optional { write!(f, " [{token}]")? } else { write!(f, " {token}")? }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UsageDefinitionBuilder {
    directive: String,
    parameters: Vec<ParameterDefinition>,
}

impl UsageDefinitionBuilder {
    pub fn define(mut self, name: impl Into<String>, token_type: TokenType) -> Self {
        self.parameters.push(ParameterDefinition { name: name.into(), token_type, optional: false });
        self
    }

    pub fn define_optional(mut self, name: impl Into<String>, token_type: TokenType) -> Self {
        self.parameters.push(ParameterDefinition { name: name.into(), token_type, optional: true });
        self
    }

    pub fn build(self) -> UsageDefinition {
        UsageDefinition { directive: self.directive, parameters: self.parameters }
    }
}

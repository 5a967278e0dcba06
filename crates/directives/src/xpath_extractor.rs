//! `extract-xpath`: evaluates an XPath expression against an XML field and
//! stores the string result in another field.
//!
//! ```text
//! extract-xpath '<xpath>' :<source> :<target>
//! ```
//!
//! The source field may hold XML text or an already-parsed document. Rows
//! without the source field, or with a value of any other type, pass through
//! untouched. When the expression selects nothing the target is left alone.
//! Text that is not well-formed XML aborts the batch.

use tracing::{debug, trace};
use wrangler_core::{
    Arguments, Directive, DirectiveExecutionError, DirectiveParseError, ExecutorContext, Row, TokenType,
    UsageDefinition, Value,
};
use wrangler_xpath::{CompiledXPath, DocumentParser, Extraction, compile_xpath};

pub const DIRECTIVE_NAME: &str = "extract-xpath";
pub const DIRECTIVE_DESC: &str = "Extracts XPath from XML Document.";

#[derive(Debug, Default)]
pub struct XPathExtractor {
    config: Option<Config>,
}

#[derive(Debug)]
struct Config {
    xpath: CompiledXPath,
    source: String,
    target: String,
    parser: DocumentParser,
}

impl XPathExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Directive for XPathExtractor {
    fn name(&self) -> &'static str {
        DIRECTIVE_NAME
    }

    fn description(&self) -> &'static str {
        DIRECTIVE_DESC
    }

    fn define(&self) -> UsageDefinition {
        UsageDefinition::builder(DIRECTIVE_NAME)
            .define("xpath", TokenType::Text)
            .define("source", TokenType::ColumnName)
            .define("target", TokenType::ColumnName)
            .build()
    }

    fn initialize(&mut self, arguments: &Arguments) -> Result<(), DirectiveParseError> {
        let xpath = arguments.text("xpath")?;
        let compiled = compile_xpath(xpath).map_err(|err| {
            DirectiveParseError::config(DIRECTIVE_NAME, format!("XPath '{xpath}' is not valid xpath expression. {err}"))
        })?;
        let source = arguments.column("source")?;
        let target = arguments.column("target")?;
        let parser = DocumentParser::builder().namespace_aware(true).ignore_comments(true).build().map_err(|err| {
            DirectiveParseError::config(DIRECTIVE_NAME, format!("Unable to create a XML document factory. {err}"))
        })?;

        debug!(directive = DIRECTIVE_NAME, xpath, source, target, "directive initialized");
        self.config =
            Some(Config { xpath: compiled, source: source.to_owned(), target: target.to_owned(), parser });
        Ok(())
    }

    fn execute(&mut self, rows: &mut [Row], _ctx: &ExecutorContext) -> Result<(), DirectiveExecutionError> {
        let Some(config) = &self.config else {
            return Err(DirectiveExecutionError::new(DIRECTIVE_NAME, "directive has not been initialized"));
        };
        trace!(directive = DIRECTIVE_NAME, rows = rows.len(), "extracting");

        for row in rows.iter_mut() {
            let extraction = match row.get(&config.source) {
                Some(Value::Document(doc)) => config.xpath.extract(doc),
                Some(Value::Text(text)) => {
                    let doc = config.parser.parse(strip_trailing_nul(text)).map_err(|err| {
                        DirectiveExecutionError::new(DIRECTIVE_NAME, format!("Unable to parse XML document. {err}"))
                    })?;
                    config.xpath.extract(&doc)
                }
                Some(Value::Other(_)) | None => continue,
            };
            if let Extraction::Value(value) = extraction {
                row.add_or_set(config.target.as_str(), value);
            }
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.config = None;
    }
}

/// Removes one trailing U+0000, as left behind by NUL-terminated producers.
pub fn strip_trailing_nul(text: &str) -> &str {
    text.strip_suffix('\0').unwrap_or(text)
}

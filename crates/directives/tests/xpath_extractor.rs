use rstest::{fixture, rstest};
use std::sync::Arc;
use wrangler_core::{
    Arguments, Directive, DirectiveParseError, ExecutorContext, Row, Scalar, TokenType, UsageDefinition, Value,
};
use wrangler_directives::XPathExtractor;
use wrangler_directives::xpath_extractor::{DIRECTIVE_DESC, DIRECTIVE_NAME};
use wrangler_runtime::{Pipeline, StepError};
use wrangler_xpath::DocumentParser;

const BOOKSTORE: &str = "<bookstore><book><title>Dune</title></book></bookstore>";

fn arguments(xpath: &str) -> Arguments {
    Arguments::builder(DIRECTIVE_NAME).text("xpath", xpath).column("source", "xmlpayload").column("target", "title").build()
}

fn extractor(xpath: &str) -> XPathExtractor {
    let mut directive = XPathExtractor::new();
    directive.initialize(&arguments(xpath)).unwrap();
    directive
}

#[fixture]
fn titles() -> XPathExtractor {
    extractor("/bookstore/book/title/text()")
}

fn run(directive: &mut XPathExtractor, rows: &mut [Row]) {
    directive.execute(rows, &ExecutorContext::new()).unwrap();
}

fn payload(xml: &str) -> Row {
    Row::new().with("id", 1_i64).with("xmlpayload", xml)
}

#[rstest]
fn identity() {
    let directive = XPathExtractor::new();
    assert_eq!(directive.name(), "extract-xpath");
    assert_eq!(directive.description(), DIRECTIVE_DESC);
    assert_eq!(
        directive.define(),
        UsageDefinition::builder("extract-xpath")
            .define("xpath", TokenType::Text)
            .define("source", TokenType::ColumnName)
            .define("target", TokenType::ColumnName)
            .build()
    );
}

#[rstest]
fn extracts_text_into_target(mut titles: XPathExtractor) {
    let mut rows = vec![payload(BOOKSTORE)];
    run(&mut titles, &mut rows);
    assert_eq!(rows[0].get("title"), Some(&Value::Text("Dune".into())));
    assert_eq!(rows[0].get("xmlpayload"), Some(&Value::Text(BOOKSTORE.into())));
    assert_eq!(rows[0].names().collect::<Vec<_>>(), ["id", "xmlpayload", "title"]);
}

#[rstest]
fn uses_parsed_documents_directly(mut titles: XPathExtractor) {
    let doc = Arc::new(DocumentParser::builder().build().unwrap().parse(BOOKSTORE).unwrap());
    let mut rows = vec![Row::new().with("xmlpayload", Arc::clone(&doc))];
    run(&mut titles, &mut rows);
    assert_eq!(rows[0].get("title"), Some(&Value::Text("Dune".into())));
    assert_eq!(rows[0].get("xmlpayload"), Some(&Value::Document(doc)));
}

#[rstest]
#[case::absent_source(Row::new().with("other", BOOKSTORE))]
#[case::integer(Row::new().with("xmlpayload", 42_i64))]
#[case::boolean(Row::new().with("xmlpayload", true))]
#[case::null(Row::new().with("xmlpayload", Scalar::Null))]
#[case::bytes(Row::new().with("xmlpayload", Scalar::Bytes(BOOKSTORE.as_bytes().to_vec())))]
fn leaves_unusable_rows_unchanged(mut titles: XPathExtractor, #[case] row: Row) {
    let mut rows = vec![row.clone()];
    run(&mut titles, &mut rows);
    assert_eq!(rows, [row]);
}

#[rstest]
fn miss_leaves_row_unchanged_and_batch_continues() {
    let mut directive = extractor("/a/b");
    let mut rows = vec![payload("<a><c/></a>"), payload("<a><b>found</b></a>")];
    let before = rows[0].clone();
    run(&mut directive, &mut rows);
    assert_eq!(rows[0], before);
    assert_eq!(rows[1].get("title"), Some(&Value::Text("found".into())));
}

#[rstest]
fn miss_keeps_an_existing_target() {
    let mut directive = extractor("/a/b");
    let mut rows = vec![payload("<a/>").with("title", "kept")];
    run(&mut directive, &mut rows);
    assert_eq!(rows[0].get("title"), Some(&Value::Text("kept".into())));
}

#[rstest]
fn value_overwrites_an_existing_target(mut titles: XPathExtractor) {
    let mut rows = vec![payload(BOOKSTORE).with("title", "old")];
    run(&mut titles, &mut rows);
    assert_eq!(rows[0].get("title"), Some(&Value::Text("Dune".into())));
    assert_eq!(rows[0].len(), 3);
}

#[rstest]
#[case::node_set_string_value("/a/b", "<a><b>x<i>y</i></b></a>", "xy")]
#[case::empty_element_is_a_value("/a/b", "<a><b/></a>", "")]
#[case::count("count(//b)", "<a><b/><b/></a>", "2")]
#[case::boolean("boolean(/a/b)", "<a/>", "false")]
#[case::attribute("/a/@id", "<a id='7'/>", "7")]
#[case::comments_are_stripped("/a/node()[1]", "<a><!-- c --><b>v</b></a>", "v")]
#[case::namespaced_by_local_name("/*[local-name() = 'a']/*", "<x:a xmlns:x='urn:x'><x:b>v</x:b></x:a>", "v")]
#[case::entities("/a", "<a>&lt;&#x41;&gt;</a>", "<A>")]
fn extraction_results(#[case] xpath: &str, #[case] xml: &str, #[case] expected: &str) {
    let mut directive = extractor(xpath);
    let mut rows = vec![payload(xml)];
    run(&mut directive, &mut rows);
    assert_eq!(rows[0].get("title"), Some(&Value::Text(expected.into())));
}

#[rstest]
fn namespaced_elements_do_not_match_unprefixed_names() {
    let mut directive = extractor("/a/b");
    let mut rows = vec![payload("<a xmlns='urn:d'><b>v</b></a>")];
    run(&mut directive, &mut rows);
    assert!(rows[0].get("title").is_none());
}

#[rstest]
fn one_trailing_nul_is_tolerated(mut titles: XPathExtractor) {
    let mut rows = vec![payload(&format!("{BOOKSTORE}\0"))];
    run(&mut titles, &mut rows);
    assert_eq!(rows[0].get("title"), Some(&Value::Text("Dune".into())));
}

#[rstest]
fn only_one_trailing_nul_is_stripped(mut titles: XPathExtractor) {
    let mut rows = vec![payload(&format!("{BOOKSTORE}\0\0"))];
    assert!(titles.execute(&mut rows, &ExecutorContext::new()).is_err());
}

#[rstest]
#[case::malformed("<bookstore><book></bookstore>")]
#[case::empty("")]
#[case::nul_only("\0")]
#[case::not_xml("Dune")]
fn malformed_text_fails_the_batch(mut titles: XPathExtractor, #[case] xml: &str) {
    let mut rows = vec![payload(xml)];
    let err = titles.execute(&mut rows, &ExecutorContext::new()).unwrap_err();
    assert_eq!(err.directive, "extract-xpath");
    assert!(err.message.starts_with("Unable to parse XML document. "), "{}", err.message);
    assert!(err.to_string().starts_with("Error encountered while executing 'extract-xpath' : "), "{err}");
}

#[rstest]
#[case::nul_inside_element("<a>\0</a>\0")]
#[case::control_char("<a>\u{1}</a>")]
#[case::bad_name("<1a/>")]
#[case::duplicate_expanded_attribute("<a xmlns:p='u' xmlns:q='u' p:x='1' q:x='2'/>")]
fn ill_formed_characters_and_names_fail_the_batch(#[case] xml: &str) {
    let mut directive = extractor("/a");
    let mut rows = vec![payload(xml)];
    let err = directive.execute(&mut rows, &ExecutorContext::new()).unwrap_err();
    assert!(err.message.starts_with("Unable to parse XML document. "), "{}", err.message);
    assert!(rows[0].get("title").is_none());
}

#[rstest]
fn internal_entities_are_expanded() {
    let mut directive = extractor("/a");
    let mut rows = vec![payload("<!DOCTYPE a [<!ENTITY e \"x\">]><a>&e;</a>")];
    run(&mut directive, &mut rows);
    assert_eq!(rows[0].get("title"), Some(&Value::Text("x".into())));
}

#[rstest]
fn abort_is_not_atomic(mut titles: XPathExtractor) {
    let mut rows = vec![payload(BOOKSTORE), payload("<broken"), payload(BOOKSTORE)];
    assert!(titles.execute(&mut rows, &ExecutorContext::new()).is_err());
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("title"), Some(&Value::Text("Dune".into())));
    assert!(rows[1].get("title").is_none());
    assert!(rows[2].get("title").is_none());
}

#[rstest]
fn execution_is_idempotent(mut titles: XPathExtractor) {
    let input = vec![payload(BOOKSTORE), payload("<a/>"), Row::new().with("xmlpayload", 42_i64)];
    let mut once = input.clone();
    run(&mut titles, &mut once);
    let mut twice = once.clone();
    run(&mut titles, &mut twice);
    let mut again = input;
    run(&mut titles, &mut again);
    assert_eq!(once, twice);
    assert_eq!(once, again);
}

#[rstest]
fn extracting_into_the_source_replaces_the_payload() {
    let mut directive = XPathExtractor::new();
    let args = Arguments::builder(DIRECTIVE_NAME)
        .text("xpath", "/a")
        .column("source", "body")
        .column("target", "body")
        .build();
    directive.initialize(&args).unwrap();
    let mut rows = vec![Row::new().with("body", "<a>v</a>")];
    run(&mut directive, &mut rows);
    assert_eq!(rows[0].get("body"), Some(&Value::Text("v".into())));
}

#[rstest]
#[case::syntax("/bookstore/book[")]
#[case::unknown_function("/a[matches(., 'x')]")]
#[case::unbound_prefix("/x:a")]
#[case::variable("$doc/a")]
fn invalid_xpath_is_a_config_error(#[case] xpath: &str) {
    let mut directive = XPathExtractor::new();
    let err = directive.initialize(&arguments(xpath)).unwrap_err();
    assert!(matches!(err, DirectiveParseError::Config { .. }));
    let prefix = format!("XPath '{xpath}' is not valid xpath expression. ");
    assert!(err.to_string().starts_with(&prefix), "{err}");
    assert!(err.to_string().len() > prefix.len(), "diagnostic missing: {err}");
    assert!(directive.execute(&mut [payload(BOOKSTORE)], &ExecutorContext::new()).is_err());
}

#[rstest]
fn missing_arguments_are_rejected() {
    let mut directive = XPathExtractor::new();
    let args = Arguments::builder(DIRECTIVE_NAME).text("xpath", "/a").column("source", "s").build();
    assert_eq!(
        directive.initialize(&args),
        Err(DirectiveParseError::MissingArgument { directive: DIRECTIVE_NAME.into(), parameter: "target".into() })
    );
}

#[rstest]
fn executing_uninitialized_directive_fails() {
    let mut directive = XPathExtractor::new();
    assert!(directive.execute(&mut [payload(BOOKSTORE)], &ExecutorContext::new()).is_err());
}

#[rstest]
fn destroy_releases_the_compiled_query(mut titles: XPathExtractor) {
    titles.destroy();
    titles.destroy();
    let mut rows = vec![payload(BOOKSTORE)];
    let err = titles.execute(&mut rows, &ExecutorContext::new()).unwrap_err();
    assert_eq!(err.message, "directive has not been initialized");
    assert!(rows[0].get("title").is_none());
}

#[rstest]
fn runs_inside_a_pipeline() {
    let mut pipeline = Pipeline::new();
    pipeline
        .add(Box::new(XPathExtractor::new()), "extract-xpath '/bookstore/book/title/text()' :xmlpayload :title")
        .unwrap();
    let mut rows = vec![payload(BOOKSTORE), Row::new().with("xmlpayload", 42_i64)];
    pipeline.execute(&mut rows, &ExecutorContext::new()).unwrap();
    assert_eq!(rows[0].get("title"), Some(&Value::Text("Dune".into())));
    assert!(rows[1].get("title").is_none());
}

#[rstest]
fn pipeline_surfaces_invalid_queries() {
    let mut pipeline = Pipeline::new();
    let err = pipeline.add(Box::new(XPathExtractor::new()), "extract-xpath '//' :xmlpayload :title").unwrap_err();
    assert_eq!(err.index, 0);
    assert!(matches!(err.source, StepError::Parse(DirectiveParseError::Config { .. })));
    assert!(pipeline.is_empty());
}

use rstest::{fixture, rstest};
use wrangler_xpath::model::{Document, DocumentParser, NodeKind};
use wrangler_xpath::runtime::StaticContextBuilder;
use wrangler_xpath::xdm::XPathValue;
use wrangler_xpath::{CompiledXPath, compile_with_context};

const LIBRARY: &str = concat!(
    r#"<library xmlns:b="urn:books" xml:lang="en">"#,
    r#"<b:book id="1" b:year="1999"><title>Rust</title><price>30</price></b:book>"#,
    r#"<b:book id="2" xml:lang="de-AT"><title>XML</title><price>12.5</price></b:book>"#,
    "<!-- note -->",
    r#"<magazine id="3" xml:id="m3"><title>Monthly</title></magazine>"#,
    "<?render fast?>",
    "</library>"
);

#[fixture]
fn library() -> Document {
    DocumentParser::builder().build().unwrap().parse(LIBRARY).unwrap()
}

fn compile(xpath: &str) -> CompiledXPath {
    // `x` is bound to the same URI under a different prefix than the document uses.
    let ctx = StaticContextBuilder::new().with_namespace("b", "urn:books").with_namespace("x", "urn:books").build();
    compile_with_context(xpath, &ctx).unwrap()
}

fn node_set(doc: &Document, xpath: &str) -> Vec<String> {
    match compile(xpath).evaluate(doc).unwrap() {
        XPathValue::NodeSet(nodes) => nodes
            .into_iter()
            .map(|n| match doc.kind(n) {
                NodeKind::Element | NodeKind::Attribute => doc.name(n).unwrap().to_string(),
                NodeKind::Text => format!("text:{}", doc.value(n)),
                NodeKind::ProcessingInstruction => format!("pi:{}", doc.name(n).unwrap()),
                NodeKind::Comment => "comment".to_owned(),
                NodeKind::Document => "/".to_owned(),
            })
            .collect(),
        other => panic!("expected a node-set from {xpath}, got {other:?}"),
    }
}

fn string(doc: &Document, xpath: &str) -> String {
    compile(xpath).evaluate(doc).unwrap().to_xpath_string(doc)
}

#[rstest]
#[case::children("/library/*", &["b:book", "b:book", "magazine"])]
#[case::descendants("//title", &["title", "title", "title"])]
#[case::prefix_independent("/library/x:book", &["b:book", "b:book"])]
#[case::ancestors("//price/ancestor::*", &["library", "b:book", "b:book"])]
#[case::ancestor_or_self("/library/magazine/ancestor-or-self::node()", &["/", "library", "magazine"])]
#[case::preceding("//magazine/preceding::title", &["title", "title"])]
#[case::following("/library/b:book[1]/following::price", &["price"])]
#[case::following_siblings("/library/b:book[1]/following-sibling::node()", &["b:book", "magazine", "pi:render"])]
#[case::parent("//title[. = 'XML']/..", &["b:book"])]
#[case::self_axis("//*/self::magazine", &["magazine"])]
#[case::union_in_document_order("//magazine | //b:book", &["b:book", "b:book", "magazine"])]
#[case::text_nodes("/library/b:book/title/text()", &["text:Rust", "text:XML"])]
#[case::ns_wildcard("//b:*", &["b:book", "b:book"])]
#[case::attributes_of_book("/library/b:book[1]/@*", &["id", "b:year"])]
#[case::namespaced_attribute("//@b:year", &["b:year"])]
#[case::pi_by_target("//processing-instruction('render')", &["pi:render"])]
#[case::pi_other_target("//processing-instruction('other')", &[])]
#[case::no_comments_by_default("//comment()", &[])]
#[case::unprefixed_name_has_no_namespace("/library/book", &[])]
fn selects(library: Document, #[case] xpath: &str, #[case] expected: &[&str]) {
    assert_eq!(node_set(&library, xpath), expected);
}

#[rstest]
#[case::positional("/library/b:book[2]/title", "XML")]
#[case::attribute_from_parent("//title[. = 'XML']/../@id", "2")]
#[case::reverse_axis_position("//magazine/preceding-sibling::*[1]/@id", "2")]
#[case::reverse_axis_last("//magazine/preceding-sibling::*[last()]/@id", "1")]
#[case::filter_last("(//title)[last()]", "Monthly")]
#[case::step_last("//title[last()]", "Rust")]
#[case::numeric_compare("//b:book[price > 20]/title", "Rust")]
#[case::or_predicate("count(//b:book[price > 20 or @id = 2])", "2")]
#[case::chained_predicates("//*[@id][position() = 2]/title", "XML")]
#[case::all_attributes("count(//@*)", "7")]
#[case::sum("sum(//price)", "42.5")]
#[case::root_string_value("/", "Rust30XML12.5Monthly")]
#[case::node_set_equality("//b:book[title = //magazine/title]", "")]
#[case::lang("//title[lang('de')]", "XML")]
#[case::lang_inherited("count(//title[lang('EN')])", "2")]
#[case::id("id('m3')/title", "Monthly")]
#[case::id_tokens("count(id('x  m3 y'))", "1")]
#[case::local_name("local-name(/library/*[1])", "book")]
#[case::name("name(/library/*[1])", "b:book")]
#[case::namespace_uri("namespace-uri(//@b:year)", "urn:books")]
#[case::empty_name("name(//nothing)", "")]
fn evaluates(library: Document, #[case] xpath: &str, #[case] expected: &str) {
    assert_eq!(string(&library, xpath), expected);
}

#[rstest]
fn comments_are_kept_when_requested() {
    let doc = DocumentParser::builder().ignore_comments(false).build().unwrap().parse(LIBRARY).unwrap();
    assert_eq!(node_set(&doc, "//comment()"), ["comment"]);
    assert_eq!(string(&doc, "//comment()"), " note ");
}

#[rstest]
fn evaluates_from_a_context_node(library: Document) {
    let magazine = library.iter().find(|&n| library.name(n).is_some_and(|q| q.local == "magazine")).unwrap();
    let value = wrangler_xpath::evaluate_from(&compile("title"), &library, magazine).unwrap();
    assert_eq!(value.to_xpath_string(&library), "Monthly");
}

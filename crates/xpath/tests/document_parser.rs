use rstest::rstest;
use wrangler_xpath::model::{DocumentParser, NodeKind, ParserConfigError, ParserOptions, XmlError};
use wrangler_xpath::runtime::StaticContextBuilder;
use wrangler_xpath::{Extraction, MissReason, compile_with_context, compile_xpath};

fn parse(xml: &str) -> Result<wrangler_xpath::Document, XmlError> {
    DocumentParser::builder().build().unwrap().parse(xml)
}

#[rstest]
#[case::mismatched_end("<a><b></a>")]
#[case::bad_attribute("<a x=1/>")]
#[case::unclosed_tag("<a")]
#[case::double_hyphen_comment("<a><!-- x -- y --></a>")]
#[case::nul_in_text("<a>\0</a>")]
#[case::control_char_in_text("<a>\u{1}</a>")]
#[case::nul_in_attribute("<a x='\0'/>")]
#[case::control_char_in_cdata("<a><![CDATA[\u{8}]]></a>")]
#[case::control_char_in_comment("<a><!-- \u{1b} --></a>")]
#[case::control_char_in_pi("<a><?t \u{2}?></a>")]
#[case::noncharacter("<a>\u{fffe}</a>")]
#[case::nul_char_reference("<a>&#0;</a>")]
#[case::control_char_reference("<a x='&#x1;'/>")]
#[case::lt_in_attribute("<a x='<'/>")]
#[case::cdata_end_in_text("<a>]]></a>")]
#[case::lone_ampersand("<a>x & y</a>")]
#[case::digit_name_start("<1a/>")]
#[case::bad_attribute_name("<a -x='1'/>")]
#[case::empty_prefix("<:a/>")]
#[case::two_colons("<p:q:a xmlns:p='u'/>")]
#[case::late_declaration("<a/><?xml version='1.0'?>")]
#[case::declaration_after_whitespace(" <?xml version='1.0'?><a/>")]
#[case::reserved_pi_target("<a><?XML x?></a>")]
#[case::doctype_after_root("<a/><!DOCTYPE a>")]
#[case::same_expanded_attribute("<a xmlns:p='u' xmlns:q='u' p:x='1' q:x='2'/>")]
#[case::same_raw_attribute("<a x='1' x='2'/>")]
fn rejects_malformed_markup(#[case] xml: &str) {
    assert!(parse(xml).is_err(), "{xml:?} should be rejected");
}

#[rstest]
fn reports_the_violated_production() {
    assert_eq!(parse("<a>\0</a>").unwrap_err(), XmlError::IllegalCharacter { code: 0, position: 3 });
    assert!(matches!(parse("<1a/>"), Err(XmlError::InvalidName { ref name, .. }) if name == "1a"));
    assert!(matches!(
        parse("<a xmlns:p='u' xmlns:q='u' p:x='1' q:x='2'/>"),
        Err(XmlError::DuplicateAttribute { ref name, .. }) if name == "q:x"
    ));
    assert!(matches!(parse("<a>]]></a>"), Err(XmlError::Syntax { .. })));
}

#[rstest]
#[case::distinct_namespaces("<a xmlns:p='u' xmlns:q='v' p:x='1' q:x='2'/>")]
#[case::prefixed_and_plain("<a xmlns:p='u' p:x='1' x='2'/>")]
#[case::non_ascii_names("<ä·b é='1'/>")]
#[case::pi_named_like_xml("<a><?xml-stylesheet href='s'?></a>")]
#[case::brackets_in_text("<a>]] ]></a>")]
#[case::astral_text("<a>\u{1f600}</a>")]
fn accepts_well_formed_edge_cases(#[case] xml: &str) {
    assert!(parse(xml).is_ok(), "{xml:?} should parse: {:?}", parse(xml));
}

#[rstest]
fn expands_internal_entities() {
    let doc = parse(
        "<!DOCTYPE a [\n  <!ENTITY e \"x\">\n  <!ENTITY greeting 'hello &e;&#33;'>\n]><a t='&e;'>&greeting; &e;</a>",
    )
    .unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(doc.string_value(a), "hello x! x");
    assert_eq!(doc.attribute(a, "t", None), Some("x"));
}

#[rstest]
#[case::undeclared("<a>&e;</a>")]
#[case::external("<!DOCTYPE a [<!ENTITY e SYSTEM 'e.xml'>]><a>&e;</a>")]
#[case::recursive("<!DOCTYPE a [<!ENTITY e '&e;'>]><a>&e;</a>")]
#[case::markup("<!DOCTYPE a [<!ENTITY e '<b/>'>]><a>&e;</a>")]
fn rejects_unusable_entity_references(#[case] xml: &str) {
    assert!(matches!(parse(xml), Err(XmlError::Reference { .. })), "{xml:?}: {:?}", parse(xml));
}

#[rstest]
#[case::empty("", XmlError::NoRootElement)]
#[case::only_whitespace("  \n", XmlError::NoRootElement)]
#[case::comment_only("<!-- c -->", XmlError::NoRootElement)]
fn rejects_documents_without_root(#[case] xml: &str, #[case] expected: XmlError) {
    assert_eq!(parse(xml).unwrap_err(), expected);
}

#[rstest]
fn rejects_document_level_errors() {
    assert!(matches!(parse("<a/><b/>"), Err(XmlError::MultipleRoots { ref name, .. }) if name == "b"));
    assert!(matches!(parse("text<a/>"), Err(XmlError::TextOutsideRoot { .. })));
    assert!(matches!(parse("<p:a/>"), Err(XmlError::UnboundPrefix { ref prefix, .. }) if prefix == "p"));
    assert!(parse("<a><b>").is_err());
    assert!(parse("<a>&undefined;</a>").is_err());
}

#[rstest]
fn resolves_references_and_cdata() {
    let doc = parse("<a t='x&#9;y'>&lt;&#65;&amp;<![CDATA[<x>]]></a>").unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(doc.string_value(a), "<A&<x>");
    assert_eq!(doc.attribute(a, "t", None), Some("x\ty"));
}

#[rstest]
fn normalizes_line_ends_and_attribute_whitespace() {
    let doc = parse("<a t='1\n2'>x\r\ny\rz</a>").unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(doc.string_value(a), "x\ny\nz");
    assert_eq!(doc.attribute(a, "t", None), Some("1 2"));
}

#[rstest]
fn keeps_prolog_and_strips_bom() {
    let doc = parse("\u{feff}<?xml version='1.0'?>\n<!DOCTYPE a>\n<a>ok</a>\n").unwrap();
    assert_eq!(doc.string_value(doc.root()), "ok");
}

#[rstest]
fn comments_are_dropped_by_default() {
    let doc = parse("<a>x<!-- hidden -->y</a>").unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(doc.children(a).len(), 1, "adjacent text is merged once the comment is gone");
    assert_eq!(doc.string_value(a), "xy");

    let doc = DocumentParser::builder().ignore_comments(false).build().unwrap().parse("<a>x<!-- kept -->y</a>").unwrap();
    let a = doc.document_element().unwrap();
    let kinds: Vec<_> = doc.children(a).iter().map(|&n| doc.kind(n)).collect();
    assert_eq!(kinds, [NodeKind::Text, NodeKind::Comment, NodeKind::Text]);
    assert_eq!(doc.string_value(a), "xy");
}

#[rstest]
fn default_namespace_applies_to_elements_only() {
    let doc = parse("<a xmlns='urn:d' k='v'><b/></a>").unwrap();
    let ctx = StaticContextBuilder::new().with_namespace("d", "urn:d").build();

    let miss = compile_xpath("/a").unwrap().extract(&doc);
    assert_eq!(miss, Extraction::Miss(MissReason::EmptyNodeSet));
    let hit = compile_with_context("count(/d:a/d:b)", &ctx).unwrap().extract(&doc);
    assert_eq!(hit.value(), Some("1"));
    let attr = compile_with_context("/d:a/@k", &ctx).unwrap().extract(&doc);
    assert_eq!(attr.value(), Some("v"));
}

#[rstest]
fn namespace_declarations_are_not_attributes() {
    let doc = parse("<p:a xmlns:p='urn:x' xmlns='urn:d' id='1'/>").unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(doc.attributes(a).len(), 1);
    assert_eq!(doc.name(a).unwrap().ns_uri(), Some("urn:x"));
}

#[rstest]
fn namespace_unaware_keeps_names_verbatim() {
    let parser = DocumentParser::builder().namespace_aware(false).build().unwrap();
    let doc = parser.parse("<p:a xmlns:p='urn:x'><q:b/></p:a>").unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(doc.name(a).unwrap().to_string(), "p:a");
    assert_eq!(doc.name(a).unwrap().ns_uri(), None);
    assert_eq!(doc.attributes(a).len(), 1);
}

#[rstest]
fn enforces_depth_limit() {
    let parser = DocumentParser::builder().max_depth(Some(2)).build().unwrap();
    assert!(parser.parse("<a><b/></a>").is_ok());
    assert_eq!(parser.parse("<a><b><c/></b></a>").unwrap_err(), XmlError::TooDeep { limit: 2 });

    let unlimited = DocumentParser::builder().max_depth(None).build().unwrap();
    let deep = format!("{}{}", "<a>".repeat(2000), "</a>".repeat(2000));
    assert!(unlimited.parse(&deep).is_ok());
    assert!(matches!(parse(&deep), Err(XmlError::TooDeep { limit: 1024 })));
}

#[rstest]
fn options_round_trip_through_config() {
    let options: ParserOptions = serde_json::from_str(r#"{ "ignore_comments": false }"#).unwrap();
    assert_eq!(options, ParserOptions { ignore_comments: false, ..ParserOptions::default() });
    assert!(serde_json::from_str::<ParserOptions>(r#"{ "validate": true }"#).is_err());

    let zero = ParserOptions { max_depth: Some(0), ..ParserOptions::default() };
    assert_eq!(DocumentParser::with_options(zero).unwrap_err(), ParserConfigError::ZeroMaxDepth);
}

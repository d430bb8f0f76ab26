//! Rendering a loaded document to SVG

use process_figures::{render_svg, Document, EngineConfig, Skin, SvgConfig};

const DOCUMENT: &str = r#"
[[node]]
id = "receive"
type = "start"
title = "Receive <request>"
geometry = "origin:100:100|size:64"

[[node.socket]]
id = "receive.out"
direction = "exit"

[[node.socket.parameter]]
id = "receive.out.request"
type = "request"

[[node]]
id = "answer"
type = "activity"
geometry = "origin:100:300|size:96:48"

[[node.socket]]
id = "answer.in"
direction = "entry"

[[node.socket.parameter]]
id = "answer.in.request"
type = "request"

[[link]]
id = "flow"
kind = "control"
source = "receive.out"
target = "answer.in"
transaction = "begin"

[[link]]
id = "data"
kind = "data"
source = "receive.out.request"
target = "answer.in.request"

[[variable_link]]
id = "log"
parameter = "answer.in.request"
variable = "audit"
"#;

fn render(config: &SvgConfig) -> String {
    let skin = Skin::default();
    let diagram = Document::from_toml(DOCUMENT)
        .unwrap()
        .load(&skin, EngineConfig::default())
        .unwrap();
    render_svg(&diagram, &skin, config)
}

#[test]
fn test_document_renders_every_figure() {
    let svg = render(&SvgConfig::default());

    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert!(svg.contains(r#"id="receive""#));
    assert!(svg.contains(r#"id="answer""#));
    // Titles are escaped
    assert!(svg.contains("Receive &lt;request&gt;"));
    // Control, data and variable connections
    assert!(svg.matches(r#"fill="none""#).count() >= 3);
    assert!(svg.contains(">B</text>"));
    assert!(svg.contains("blur"));
}

#[test]
fn test_shadows_can_be_turned_off() {
    let svg = render(&SvgConfig::default().with_shadows(false));
    assert!(!svg.contains("blur"));
    assert!(svg.contains(r#"id="receive""#));
}

#[test]
fn test_embedded_output_has_no_xml_declaration() {
    let svg = render(&SvgConfig::default().with_standalone(false));
    assert!(svg.starts_with("<svg"));
}

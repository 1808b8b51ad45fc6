//! Markup tokenizer and serializer for the editable surface.
//!
//! Built on `winnow` 0.7. The parser is lenient in the way browsers are:
//! unknown tags are kept, unclosed elements close at end of input, stray
//! closing tags are ignored and a `<` that does not start a tag is text.
//! Comments and doctype declarations are dropped.
//!
//! Transform records travel inside the markup as `data-*` attributes so a
//! snapshot restores them along with the content.

use crate::error::{EditorError, EditorResult};
use crate::surface::{Element, NodeId, NodeKind, NodeTransform, Style, Surface, parse_px};
use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{take_till, take_until, take_while};

const ATTR_TX: &str = "data-tx";
const ATTR_TY: &str = "data-ty";
const ATTR_ROTATION: &str = "data-rotation";
const ATTR_BASE: &str = "data-orig-transform";
const ATTR_WIDTH: &str = "data-width";
const ATTR_HEIGHT: &str = "data-height";

const RECORD_ATTRS: [&str; 6] = [ATTR_TX, ATTR_TY, ATTR_ROTATION, ATTR_BASE, ATTR_WIDTH, ATTR_HEIGHT];

/// Elements that never have children or a closing tag.
const VOID_TAGS: [&str; 9] = ["area", "br", "col", "hr", "img", "input", "link", "meta", "source"];

/// Elements whose content is raw text up to the matching close tag.
const RAW_TEXT_TAGS: [&str; 2] = ["style", "script"];

fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Parse markup into a surface.
pub fn parse(input: &str) -> EditorResult<Surface> {
    let mut surface = Surface::new();
    let mut open: Vec<(NodeId, String)> = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let offset = input.len() - rest.len();
        let parent = open.last().map(|(id, _)| *id);

        if rest.starts_with("<!--") {
            rest = &rest[4..];
            take_until::<_, _, ContextError>(0.., "-->")
                .parse_next(&mut rest)
                .map_err(|_| EditorError::Parse {
                    offset,
                    message: "unterminated comment".to_string(),
                })?;
            rest = &rest[3..];
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            // Doctype / processing instruction
            let _ = take_till::<_, _, ContextError>(0.., '>').parse_next(&mut rest);
            rest = rest.strip_prefix('>').unwrap_or(rest);
        } else if starts_tag(rest, true) {
            let name = parse_close_tag(&mut rest).map_err(|e| err(offset, e))?;
            if let Some(pos) = open.iter().rposition(|(_, tag)| *tag == name) {
                open.truncate(pos);
            } else {
                log::debug!("Ignoring stray closing tag </{}> at byte {}", name, offset);
            }
        } else if starts_tag(rest, false) {
            let tag = parse_open_tag(&mut rest).map_err(|e| err(offset, e))?;
            let name = tag.element.tag.clone();
            let id = surface.append_element(parent, tag.element);
            if let Some(record) = tag.record {
                surface.insert_transform(id, record);
            }
            if RAW_TEXT_TAGS.contains(&name.as_str()) && !tag.self_closing {
                let close = format!("</{name}");
                let body = match rest.find(&close) {
                    Some(end) => &rest[..end],
                    None => rest,
                };
                if !body.is_empty() {
                    surface.append_text(Some(id), body);
                }
                rest = &rest[body.len()..];
                if !rest.is_empty() {
                    let _ = parse_close_tag(&mut rest).map_err(|e| err(offset, e))?;
                }
            } else if !tag.self_closing && !is_void(&name) {
                open.push((id, name));
            }
        } else {
            // Text up to the next tag start. A lone '<' is part of the text.
            let skip = usize::from(rest.starts_with('<'));
            let end = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
            surface.append_text(parent, &rest[..end]);
            rest = &rest[end..];
        }
    }

    Ok(surface)
}

fn err(offset: usize, e: winnow::error::ErrMode<ContextError>) -> EditorError {
    EditorError::Parse {
        offset,
        message: e.to_string(),
    }
}

/// Whether `rest` starts an opening (or closing) tag.
fn starts_tag(rest: &str, closing: bool) -> bool {
    let prefix = if closing { "</" } else { "<" };
    rest.strip_prefix(prefix)
        .and_then(|r| r.chars().next())
        .is_some_and(|c| c.is_ascii_alphabetic())
}

struct OpenTag {
    element: Element,
    record: Option<NodeTransform>,
    self_closing: bool,
}

fn tag_name(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
        .map(|s: &str| s.to_ascii_lowercase())
        .parse_next(input)
}

fn attr_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'')
    })
    .parse_next(input)
}

fn attr_value<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
        take_while(1.., |c: char| {
            !c.is_whitespace() && !matches!(c, '>' | '"' | '\'')
        }),
    ))
    .parse_next(input)
}

fn parse_close_tag(input: &mut &str) -> ModalResult<String> {
    let _ = "</".parse_next(input)?;
    let name = tag_name(input)?;
    let _ = take_till(0.., '>').parse_next(input)?;
    let _ = '>'.parse_next(input)?;
    Ok(name)
}

fn parse_open_tag(input: &mut &str) -> ModalResult<OpenTag> {
    let _ = '<'.parse_next(input)?;
    let tag = tag_name(input)?;
    let mut element = Element::new(tag);
    let mut self_closing = false;

    loop {
        let _: &str = multispace0.parse_next(input)?;
        if input.starts_with("/>") {
            *input = &input[2..];
            self_closing = true;
            break;
        }
        if input.starts_with('>') {
            *input = &input[1..];
            break;
        }
        if input.starts_with('/') {
            *input = &input[1..];
            continue;
        }
        let name = attr_name(input)?.to_ascii_lowercase();
        let _: &str = multispace0.parse_next(input)?;
        let value = if input.starts_with('=') {
            *input = &input[1..];
            let _: &str = multispace0.parse_next(input)?;
            attr_value(input)?.to_string()
        } else {
            String::new()
        };
        if name == "style" {
            element.style = Style::parse(&value);
        } else {
            element.attributes.push((name, value));
        }
    }

    let record = take_record(&mut element);
    Ok(OpenTag {
        element,
        record,
        self_closing,
    })
}

/// Pull the transform record out of an element's `data-*` attributes.
fn take_record(element: &mut Element) -> Option<NodeTransform> {
    element.attribute(ATTR_TX)?;
    let number = |name: &str| element.attribute(name).and_then(parse_px);
    let record = NodeTransform {
        translate_x: number(ATTR_TX).unwrap_or(0.0),
        translate_y: number(ATTR_TY).unwrap_or(0.0),
        rotation_degrees: number(ATTR_ROTATION).unwrap_or(0.0),
        base_transform: element.attribute(ATTR_BASE).unwrap_or("").to_string(),
        width: number(ATTR_WIDTH),
        height: number(ATTR_HEIGHT),
    };
    element
        .attributes
        .retain(|(name, _)| !RECORD_ATTRS.contains(&name.as_str()));
    Some(record)
}

/// Serialize a surface back into markup.
pub fn serialize(surface: &Surface) -> String {
    let mut out = String::new();
    for &root in surface.roots() {
        write_node(surface, root, &mut out);
    }
    out
}

fn write_node(surface: &Surface, id: NodeId, out: &mut String) {
    let Some(node) = surface.node(id) else { return };
    let element = match &node.kind {
        NodeKind::Text(text) => {
            let raw_parent = node
                .parent
                .and_then(|p| surface.element(p))
                .is_some_and(|p| RAW_TEXT_TAGS.contains(&p.tag.as_str()));
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&text.replace('<', "&lt;"));
            }
            return;
        }
        NodeKind::Element(element) => element,
    };

    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attributes {
        write_attr(out, name, value);
    }

    let mut style = element.style.clone();
    if let Some(record) = surface.transform(id) {
        // An identity record renders as its base transform and leaves no
        // data attributes behind.
        if !record.is_identity() {
            write_attr(out, ATTR_TX, &record.translate_x.to_string());
            write_attr(out, ATTR_TY, &record.translate_y.to_string());
            write_attr(out, ATTR_ROTATION, &record.rotation_degrees.to_string());
            write_attr(out, ATTR_BASE, &record.base_transform);
            if let Some(width) = record.width {
                write_attr(out, ATTR_WIDTH, &width.to_string());
            }
            if let Some(height) = record.height {
                write_attr(out, ATTR_HEIGHT, &height.to_string());
            }
        }
        apply_record_style(&mut style, record);
    }
    if !style.is_empty() {
        write_attr(out, "style", &style.to_css());
    }
    out.push('>');

    if is_void(&element.tag) {
        return;
    }
    for &child in &node.children {
        write_node(surface, child, out);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

/// Fold a transform record into the inline style it renders with.
fn apply_record_style(style: &mut Style, record: &NodeTransform) {
    let css = record.css();
    if css.is_empty() {
        style.remove("transform");
    } else {
        style.set("transform", css);
    }
    if let Some(width) = record.width {
        style.set("width", format!("{width}px"));
    }
    if let Some(height) = record.height {
        style.set("height", format!("{height}px"));
    }
    if record.width.is_some() || record.height.is_some() {
        style.set("box-sizing", "border-box");
    }
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&value.replace('"', "&quot;"));
    out.push('"');
}

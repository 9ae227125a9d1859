//! HTML text bridge: markup goes out as plain text for translation and the
//! translated text comes back into the original fragment.
//!
//! Restoration is deliberately conservative. A fragment with exactly one
//! non-whitespace text node gets that node's content replaced; anything else
//! (zero or multiple text nodes) is returned unchanged, byte for byte. The
//! plain-text translation is still available to the caller in that case.

use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

/// Render markup into its text-only form, collapsing all tags and
/// normalizing whitespace. Script and style contents are not text.
pub fn strip(markup: &str) -> String {
    let Some(dom) = parse(markup) else {
        return String::new();
    };

    let mut collected = String::new();
    collect_text(&dom.document, &mut collected);
    collected.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Re-insert translated text into the fragment it was stripped from.
///
/// If the fragment holds exactly one non-whitespace text node, its content
/// is replaced with `translated_text` verbatim and the fragment is
/// re-serialized. With zero or two-or-more text nodes the original markup is
/// returned unchanged.
pub fn restore(original_markup: &str, translated_text: &str) -> String {
    let Some(dom) = parse(original_markup) else {
        return original_markup.to_string();
    };
    let Some(body) = find_element(&dom.document, "body") else {
        return original_markup.to_string();
    };

    let mut text_nodes = Vec::new();
    collect_text_nodes(&body, &mut text_nodes);
    if text_nodes.len() != 1 {
        return original_markup.to_string();
    }

    if let NodeData::Text { contents } = &text_nodes[0].data {
        let mut contents = contents.borrow_mut();
        contents.clear();
        contents.push_slice(translated_text);
    }

    serialize_children(&body).unwrap_or_else(|| original_markup.to_string())
}

fn parse(markup: &str) -> Option<RcDom> {
    let mut input = std::io::Cursor::new(markup.as_bytes());
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut input)
        .ok()
}

fn is_opaque_element(handle: &Handle) -> bool {
    match &handle.data {
        NodeData::Element { name, .. } => {
            matches!(name.local.as_ref(), "script" | "style")
        }
        _ => false,
    }
}

fn collect_text(handle: &Handle, out: &mut String) {
    if is_opaque_element(handle) {
        return;
    }
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
        out.push(' ');
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// Collect every text node that contains something other than whitespace.
fn collect_text_nodes(handle: &Handle, out: &mut Vec<Handle>) {
    if let NodeData::Text { contents } = &handle.data {
        if !contents.borrow().trim().is_empty() {
            out.push(handle.clone());
        }
    }
    for child in handle.children.borrow().iter() {
        collect_text_nodes(child, out);
    }
}

fn find_element(handle: &Handle, local: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if name.local.as_ref() == local {
            return Some(handle.clone());
        }
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_element(child, local) {
            return Some(found);
        }
    }
    None
}

fn serialize_children(handle: &Handle) -> Option<String> {
    let mut buf = Vec::new();
    let serializable = SerializableHandle::from(handle.clone());
    serialize(
        &mut buf,
        &serializable,
        SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        },
    )
    .ok()?;
    String::from_utf8(buf).ok()
}

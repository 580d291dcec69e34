//! Markup serialization and character references.

use crate::node::{Node, NodeType};

/// Elements that never have children or an end tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
	"track", "wbr",
];

/// Elements whose content is raw text.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn is_void(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag)
}

pub(crate) fn is_raw_text(tag: &str) -> bool {
	RAW_TEXT_ELEMENTS.contains(&tag)
}

pub(crate) fn write_node(node: &Node, out: &mut String) {
	match node.node_type() {
		NodeType::Element => {
			let tag = node.tag_name().unwrap_or_default();
			out.push('<');
			out.push_str(tag);
			for (name, value) in node.attributes() {
				out.push(' ');
				out.push_str(&name);
				out.push_str("=\"");
				out.push_str(&escape_attribute(&value));
				out.push('"');
			}
			out.push('>');
			if is_void(tag) {
				return;
			}
			write_children(node, out);
			out.push_str("</");
			out.push_str(tag);
			out.push('>');
		}
		NodeType::Text => {
			let raw = node
				.parent_element()
				.is_some_and(|parent| parent.tag_name().is_some_and(is_raw_text));
			if raw {
				out.push_str(&node.data());
			} else {
				out.push_str(&escape_text(&node.data()));
			}
		}
		NodeType::Comment => {
			out.push_str("<!--");
			out.push_str(&node.data());
			out.push_str("-->");
		}
		NodeType::Fragment => write_children(node, out),
	}
}

pub(crate) fn write_children(node: &Node, out: &mut String) {
	for child in node.children() {
		write_node(&child, out);
	}
}

/// Escape text content.
pub fn escape_text(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for ch in text.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			_ => out.push(ch),
		}
	}
	out
}

/// Escape a double-quoted attribute value.
pub fn escape_attribute(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	for ch in value.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			_ => out.push(ch),
		}
	}
	out
}

/// Decode named and numeric character references.
///
/// Unknown references are left untouched.
pub fn decode_entities(input: &str) -> String {
	if !input.contains('&') {
		return input.to_string();
	}

	let mut out = String::with_capacity(input.len());
	let mut rest = input;
	while let Some(start) = rest.find('&') {
		out.push_str(&rest[..start]);
		rest = &rest[start..];

		let decoded = rest
			.find(';')
			.filter(|end| *end <= 10)
			.and_then(|end| lookup_entity(&rest[1..end]).map(|ch| (ch, end)));
		match decoded {
			Some((ch, end)) => {
				out.push(ch);
				rest = &rest[end + 1..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}

fn lookup_entity(name: &str) -> Option<char> {
	match name {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		_ => {
			let digits = name.strip_prefix('#')?;
			let code = match digits.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => digits.parse::<u32>().ok()?,
			};
			char::from_u32(code)
		}
	}
}

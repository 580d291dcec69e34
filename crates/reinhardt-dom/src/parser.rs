//! Lenient HTML fragment parser.
//!
//! Markup is split into tokens with `nom`, then assembled into a tree with an open-element
//! stack. Parsing never fails: anything that is not a recognizable tag is kept as text,
//! unmatched end tags are dropped and unclosed elements are closed at the end of input.

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_until, take_while, take_while1},
	character::complete::{char, multispace0, multispace1},
	combinator::{map, opt, recognize, value},
	multi::many0,
	sequence::{delimited, pair, preceded},
};

use crate::html::{decode_entities, is_raw_text, is_void};
use crate::node::Node;

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
	StartTag {
		name: String,
		attributes: Vec<(String, String)>,
		self_closing: bool,
	},
	EndTag(String),
	Text(&'a str),
	Comment(&'a str),
	Skip,
}

fn tag_name(input: &str) -> IResult<&str, &str> {
	recognize(pair(
		take_while1(|c: char| c.is_ascii_alphabetic()),
		take_while(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_'),
	))
	.parse(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
	map(
		delimited(tag("<!--"), take_until("-->"), tag("-->")),
		Token::Comment,
	)
	.parse(input)
}

fn doctype(input: &str) -> IResult<&str, Token<'_>> {
	value(Token::Skip, (tag("<!"), take_until(">"), char('>'))).parse(input)
}

fn end_tag(input: &str) -> IResult<&str, Token<'_>> {
	map(
		(tag("</"), tag_name, multispace0, char('>')),
		|(_, name, _, _): (&str, &str, &str, char)| Token::EndTag(name.to_ascii_lowercase()),
	)
	.parse(input)
}

fn attribute_name(input: &str) -> IResult<&str, &str> {
	take_while1(|c: char| {
		!c.is_whitespace() && !matches!(c, '/' | '>' | '=' | '"' | '\'' | '<')
	})
	.parse(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
	alt((
		delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
		delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
		take_while1(|c: char| !c.is_whitespace() && c != '>'),
	))
	.parse(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, Option<&str>)> {
	preceded(
		multispace1,
		pair(
			attribute_name,
			opt(preceded((multispace0, char('='), multispace0), attribute_value)),
		),
	)
	.parse(input)
}

fn start_tag(input: &str) -> IResult<&str, Token<'_>> {
	map(
		(
			char('<'),
			tag_name,
			many0(attribute),
			multispace0,
			opt(char('/')),
			char('>'),
		),
		|(_, name, raw_attributes, _, slash, _)| {
			let mut attributes: Vec<(String, String)> = Vec::with_capacity(raw_attributes.len());
			for (key, raw_value) in raw_attributes {
				let key = key.to_ascii_lowercase();
				// First occurrence wins
				if attributes.iter().any(|(existing, _)| *existing == key) {
					continue;
				}
				let value = raw_value.map(decode_entities).unwrap_or_default();
				attributes.push((key, value));
			}
			Token::StartTag {
				name: name.to_ascii_lowercase(),
				attributes,
				self_closing: slash.is_some(),
			}
		},
	)
	.parse(input)
}

fn text(input: &str) -> IResult<&str, Token<'_>> {
	map(take_while1(|c: char| c != '<'), Token::Text).parse(input)
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
	alt((comment, doctype, end_tag, start_tag, text)).parse(input)
}

/// Split `input` at the end tag that closes a raw-text element.
fn raw_text<'a>(input: &'a str, name: &str) -> (&'a str, &'a str) {
	let needle = format!("</{name}");
	match input.to_ascii_lowercase().find(&needle) {
		Some(end) => input.split_at(end),
		None => (input, ""),
	}
}

fn append(parent: &Node, child: &Node) {
	if let Err(error) = parent.append_child(child) {
		tracing::warn!(%error, "dropping node that cannot be attached while parsing");
	}
}

fn append_text(parent: &Node, data: &str) {
	if data.is_empty() {
		return;
	}
	if let Some(last) = parent.children().last().filter(|last| last.node_type() == crate::NodeType::Text) {
		last.set_data(&(last.data() + data));
		return;
	}
	append(parent, &Node::text(data));
}

/// Parse `markup` into a fragment node holding the top-level nodes.
pub fn parse_fragment(markup: &str) -> Node {
	let root = Node::fragment();
	let mut stack = vec![root.clone()];
	let mut input = markup;

	while !input.is_empty() {
		let (rest, token) = match token(input) {
			Ok(parsed) => parsed,
			// A stray '<' that does not open a tag
			Err(_) => (input.get(1..).unwrap_or_default(), Token::Text("<")),
		};
		input = rest;

		let current = stack.last().cloned().unwrap_or_else(|| root.clone());
		match token {
			Token::Text(data) => append_text(&current, &decode_entities(data)),
			Token::Comment(data) => append(&current, &Node::comment(data)),
			Token::Skip => {}
			Token::EndTag(name) => {
				let open = stack
					.iter()
					.skip(1)
					.rposition(|node| node.tag_name() == Some(name.as_str()));
				if let Some(index) = open {
					stack.truncate(index + 1);
				}
			}
			Token::StartTag {
				name,
				attributes,
				self_closing,
			} => {
				let element = Node::element(&name);
				for (key, value) in &attributes {
					element.set_attribute(key, value);
				}
				append(&current, &element);

				if is_void(&name) || self_closing {
					continue;
				}
				if is_raw_text(&name) || name == "textarea" {
					let (content, rest) = raw_text(input, &name);
					input = rest;
					if name == "textarea" {
						append_text(&element, &decode_entities(content));
					} else {
						append_text(&element, content);
					}
					continue;
				}
				stack.push(element);
			}
		}
	}

	root
}

//! CSS selector engine.
//!
//! Supported syntax:
//!
//! - type (`div`) and universal (`*`) selectors
//! - `#id` and `.class`
//! - attribute selectors: `[name]`, `[name=value]`, `~=`, `^=`, `$=`, `*=`
//! - descendant (`a b`) and child (`a > b`) combinators
//! - selector lists (`a, b`)
//!
//! Matching walks right to left from the candidate element, so a selector is matched against
//! the whole tree the element lives in.

use std::fmt;
use std::str::FromStr;

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_while, take_while1},
	character::complete::{char, multispace0, multispace1},
	combinator::{map, opt, value, verify},
	multi::{many0, separated_list1},
	sequence::{delimited, pair, preceded},
};

use crate::error::SelectorError;
use crate::node::Node;

/// Attribute comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
	/// `[a=v]`
	Equals,
	/// `[a~=v]`, whitespace-separated word
	Includes,
	/// `[a^=v]`
	Prefix,
	/// `[a$=v]`
	Suffix,
	/// `[a*=v]`
	Substring,
}

/// Relationship between two compound selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
	/// Whitespace: any ancestor.
	Descendant,
	/// `>`: the parent.
	Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSelector {
	name: String,
	condition: Option<(AttrOp, String)>,
}

impl AttributeSelector {
	fn matches(&self, element: &Node) -> bool {
		let Some(actual) = element.attribute(&self.name) else {
			return false;
		};
		let Some((op, expected)) = &self.condition else {
			return true;
		};
		match op {
			AttrOp::Equals => actual == *expected,
			AttrOp::Includes => actual.split_whitespace().any(|word| word == expected),
			AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
			AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
			AttrOp::Substring => !expected.is_empty() && actual.contains(expected.as_str()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleSelector {
	Id(String),
	Class(String),
	Attribute(AttributeSelector),
}

/// A sequence of simple selectors that all apply to one element, e.g. `li.done[data-id]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
	/// Lowercase tag name; `None` for `*` or when omitted
	tag: Option<String>,
	ids: Vec<String>,
	classes: Vec<String>,
	attributes: Vec<AttributeSelector>,
}

impl CompoundSelector {
	fn matches(&self, element: &Node) -> bool {
		if !element.is_element() {
			return false;
		}
		if let Some(tag) = &self.tag {
			if element.tag_name() != Some(tag.as_str()) {
				return false;
			}
		}
		if !self.ids.is_empty() {
			let id = element.id();
			if !self.ids.iter().all(|expected| id.as_deref() == Some(expected.as_str())) {
				return false;
			}
		}
		self.classes.iter().all(|class| element.has_class(class))
			&& self.attributes.iter().all(|attribute| attribute.matches(element))
	}
}

/// Compound selectors joined by combinators, e.g. `ul > li .label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
	compounds: Vec<CompoundSelector>,
	/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`
	combinators: Vec<Combinator>,
}

impl ComplexSelector {
	fn matches(&self, element: &Node) -> bool {
		match self.compounds.len() {
			0 => false,
			len => self.matches_at(len - 1, element),
		}
	}

	fn matches_at(&self, index: usize, element: &Node) -> bool {
		if !self.compounds[index].matches(element) {
			return false;
		}
		if index == 0 {
			return true;
		}
		match self.combinators[index - 1] {
			Combinator::Child => element
				.parent_element()
				.is_some_and(|parent| self.matches_at(index - 1, &parent)),
			Combinator::Descendant => {
				let mut ancestor = element.parent_element();
				while let Some(node) = ancestor {
					if self.matches_at(index - 1, &node) {
						return true;
					}
					ancestor = node.parent_element();
				}
				false
			}
		}
	}
}

/// A parsed selector list.
#[derive(Clone, PartialEq, Eq)]
pub struct Selector {
	source: String,
	alternatives: Vec<ComplexSelector>,
}

impl Selector {
	/// Parse a selector list.
	pub fn parse(source: &str) -> Result<Self, SelectorError> {
		let error_at = |rest: &str| SelectorError {
			selector: source.to_string(),
			position: source.len() - rest.len(),
		};

		match delimited(multispace0, selector_list, multispace0).parse(source) {
			Ok(("", alternatives)) => Ok(Self {
				source: source.trim().to_string(),
				alternatives,
			}),
			Ok((rest, _)) => Err(error_at(rest)),
			Err(nom::Err::Error(error) | nom::Err::Failure(error)) => Err(error_at(error.input)),
			Err(nom::Err::Incomplete(_)) => Err(error_at("")),
		}
	}

	/// The selector text this was parsed from.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Whether `node` is an element matched by any selector in the list.
	pub fn matches(&self, node: &Node) -> bool {
		self.alternatives.iter().any(|complex| complex.matches(node))
	}

	/// The nearest inclusive ancestor of `node` that matches.
	pub fn closest(&self, node: &Node) -> Option<Node> {
		let mut current = Some(node.clone());
		while let Some(candidate) = current {
			if self.matches(&candidate) {
				return Some(candidate);
			}
			current = candidate.parent();
		}
		None
	}

	/// Like [`Selector::closest`], but gives up once `boundary` has been checked.
	///
	/// Returns `None` when `node` is not inside `boundary`.
	pub fn closest_within(&self, node: &Node, boundary: &Node) -> Option<Node> {
		if !boundary.contains(node) {
			return None;
		}
		let mut current = Some(node.clone());
		while let Some(candidate) = current {
			if self.matches(&candidate) {
				return Some(candidate);
			}
			if candidate.is_same_node(boundary) {
				break;
			}
			current = candidate.parent();
		}
		None
	}

	/// First matching descendant of `root` in document order.
	pub fn first_match(&self, root: &Node) -> Option<Node> {
		root.descendants().into_iter().find(|node| self.matches(node))
	}

	/// All matching descendants of `root` in document order.
	pub fn all_matches(&self, root: &Node) -> Vec<Node> {
		root.descendants()
			.into_iter()
			.filter(|node| self.matches(node))
			.collect()
	}
}

impl FromStr for Selector {
	type Err = SelectorError;

	fn from_str(source: &str) -> Result<Self, Self::Err> {
		Self::parse(source)
	}
}

impl fmt::Debug for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Selector").field(&self.source).finish()
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.source)
	}
}

// -------------------------------------------------------------------------
// Grammar
// -------------------------------------------------------------------------

fn identifier(input: &str) -> IResult<&str, &str> {
	take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_').parse(input)
}

fn type_selector(input: &str) -> IResult<&str, Option<String>> {
	alt((
		value(None, char('*')),
		map(identifier, |name: &str| Some(name.to_ascii_lowercase())),
	))
	.parse(input)
}

fn attribute_operator(input: &str) -> IResult<&str, AttrOp> {
	alt((
		value(AttrOp::Includes, tag("~=")),
		value(AttrOp::Prefix, tag("^=")),
		value(AttrOp::Suffix, tag("$=")),
		value(AttrOp::Substring, tag("*=")),
		value(AttrOp::Equals, tag("=")),
	))
	.parse(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
	alt((
		delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
		delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
		identifier,
	))
	.parse(input)
}

fn attribute_selector(input: &str) -> IResult<&str, AttributeSelector> {
	map(
		delimited(
			(char('['), multispace0),
			pair(
				identifier,
				opt(preceded(
					multispace0,
					pair(attribute_operator, preceded(multispace0, attribute_value)),
				)),
			),
			(multispace0, char(']')),
		),
		|(name, condition)| AttributeSelector {
			name: name.to_ascii_lowercase(),
			condition: condition.map(|(op, expected)| (op, expected.to_string())),
		},
	)
	.parse(input)
}

fn simple_selector(input: &str) -> IResult<&str, SimpleSelector> {
	alt((
		map(preceded(char('#'), identifier), |id: &str| {
			SimpleSelector::Id(id.to_string())
		}),
		map(preceded(char('.'), identifier), |class: &str| {
			SimpleSelector::Class(class.to_string())
		}),
		map(attribute_selector, SimpleSelector::Attribute),
	))
	.parse(input)
}

fn compound_selector(input: &str) -> IResult<&str, CompoundSelector> {
	map(
		verify(
			pair(opt(type_selector), many0(simple_selector)),
			|(tag, simples): &(Option<Option<String>>, Vec<SimpleSelector>)| {
				tag.is_some() || !simples.is_empty()
			},
		),
		|(tag, simples)| {
			let mut compound = CompoundSelector {
				tag: tag.flatten(),
				..CompoundSelector::default()
			};
			for simple in simples {
				match simple {
					SimpleSelector::Id(id) => compound.ids.push(id),
					SimpleSelector::Class(class) => compound.classes.push(class),
					SimpleSelector::Attribute(attribute) => compound.attributes.push(attribute),
				}
			}
			compound
		},
	)
	.parse(input)
}

fn combinator(input: &str) -> IResult<&str, Combinator> {
	alt((
		value(Combinator::Child, (multispace0, char('>'), multispace0)),
		value(Combinator::Descendant, multispace1),
	))
	.parse(input)
}

fn complex_selector(input: &str) -> IResult<&str, ComplexSelector> {
	map(
		pair(compound_selector, many0(pair(combinator, compound_selector))),
		|(head, tail)| {
			let mut compounds = vec![head];
			let mut combinators = Vec::with_capacity(tail.len());
			for (combinator, compound) in tail {
				combinators.push(combinator);
				compounds.push(compound);
			}
			ComplexSelector {
				compounds,
				combinators,
			}
		},
	)
	.parse(input)
}

fn selector_list(input: &str) -> IResult<&str, Vec<ComplexSelector>> {
	separated_list1((multispace0, char(','), multispace0), complex_selector).parse(input)
}

// -------------------------------------------------------------------------
// Node conveniences
// -------------------------------------------------------------------------

impl Node {
	/// Whether this element matches `selector`.
	pub fn matches(&self, selector: &str) -> Result<bool, SelectorError> {
		Ok(Selector::parse(selector)?.matches(self))
	}

	/// Nearest inclusive ancestor matching `selector`.
	pub fn closest(&self, selector: &str) -> Result<Option<Node>, SelectorError> {
		Ok(Selector::parse(selector)?.closest(self))
	}

	/// First descendant matching `selector`.
	pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, SelectorError> {
		Ok(Selector::parse(selector)?.first_match(self))
	}

	/// Every descendant matching `selector`, in document order.
	pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, SelectorError> {
		Ok(Selector::parse(selector)?.all_matches(self))
	}
}

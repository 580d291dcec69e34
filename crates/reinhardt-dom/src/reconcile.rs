//! In-place reconciliation of a live subtree against freshly generated nodes.
//!
//! Children are paired by position. A pair with the same node type and tag is patched in
//! place (attributes, character data, then recursively the children); any other pair is
//! replaced by a clone of the generated node. Extra live children are removed and missing
//! ones are inserted as clones.
//!
//! Protected nodes (roots owned by child controllers) are never deep-diffed. Each one claims
//! the first generated sibling with the same signature (tag, `id` and `class`) and is only
//! moved into that position. A protected node without a counterpart is removed.

use crate::error::DomError;
use crate::node::{Node, NodeType};

/// Mutations performed by one [`reconcile`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
	/// Nodes inserted as clones of generated nodes.
	pub inserted: usize,
	/// Live nodes removed.
	pub removed: usize,
	/// Live nodes replaced by a clone of an incompatible generated node.
	pub replaced: usize,
	/// Live nodes moved to a different position among their siblings.
	pub moved: usize,
	/// Attributes added, changed or removed.
	pub attributes: usize,
	/// Text or comment nodes whose data changed.
	pub texts: usize,
}

impl ReconcileStats {
	/// Total number of mutations.
	pub fn mutations(&self) -> usize {
		self.inserted + self.removed + self.replaced + self.moved + self.attributes + self.texts
	}

	/// Whether the live tree was left untouched.
	pub fn is_noop(&self) -> bool {
		self.mutations() == 0
	}
}

/// Mutate `live` so its subtree matches `generated`.
///
/// The roots themselves are never replaced: when they are compatible the root's attributes
/// are synced as well, otherwise only the children are.
pub fn reconcile(generated: &Node, live: &Node, protected: &[Node]) -> ReconcileStats {
	let mut reconciler = Reconciler {
		protected,
		stats: ReconcileStats::default(),
	};
	if is_compatible(generated, live) {
		reconciler.patch(generated, live);
	} else if !matches!(live.node_type(), NodeType::Text | NodeType::Comment) {
		reconciler.sync_children(generated, live);
	}

	let stats = reconciler.stats;
	tracing::trace!(
		inserted = stats.inserted,
		removed = stats.removed,
		replaced = stats.replaced,
		moved = stats.moved,
		attributes = stats.attributes,
		texts = stats.texts,
		"reconciled live subtree"
	);
	stats
}

fn is_compatible(generated: &Node, live: &Node) -> bool {
	generated.node_type() == live.node_type() && generated.tag_name() == live.tag_name()
}

fn same_signature(generated: &Node, live: &Node) -> bool {
	generated.is_element()
		&& is_compatible(generated, live)
		&& generated.id() == live.id()
		&& generated.attribute("class") == live.attribute("class")
}

fn check(result: Result<(), DomError>) {
	// Only reachable with nodes that are not part of the trees being reconciled.
	if let Err(error) = result {
		tracing::error!(%error, "reconciliation mutation failed");
	}
}

struct Reconciler<'a> {
	protected: &'a [Node],
	stats: ReconcileStats,
}

impl Reconciler<'_> {
	fn is_protected(&self, node: &Node) -> bool {
		self.protected.iter().any(|owned| owned.is_same_node(node))
	}

	fn patch(&mut self, generated: &Node, live: &Node) {
		match live.node_type() {
			NodeType::Text | NodeType::Comment => {
				let data = generated.data();
				if live.data() != data {
					live.set_data(&data);
					self.stats.texts += 1;
				}
			}
			NodeType::Element => {
				self.sync_attributes(generated, live);
				self.sync_children(generated, live);
			}
			NodeType::Fragment => self.sync_children(generated, live),
		}
	}

	fn sync_attributes(&mut self, generated: &Node, live: &Node) {
		let wanted = generated.attributes();
		if live.attributes() == wanted {
			return;
		}

		for (name, _) in live.attributes() {
			if !wanted.iter().any(|(key, _)| *key == name) {
				live.remove_attribute(&name);
				self.stats.attributes += 1;
			}
		}
		for (name, value) in &wanted {
			if live.attribute(name).as_ref() != Some(value) {
				live.set_attribute(name, value);
				self.stats.attributes += 1;
			}
		}

		// Same set, different order: re-append in generated order
		if live.attributes() != wanted {
			for (name, value) in &wanted {
				live.remove_attribute(name);
				live.set_attribute(name, value);
				self.stats.attributes += 1;
			}
		}
	}

	fn sync_children(&mut self, generated: &Node, live: &Node) {
		let wanted = generated.children();
		let current = live.children();

		let mut pairs: Vec<Option<Node>> = vec![None; wanted.len()];
		let mut claimed = vec![false; current.len()];

		for (live_index, node) in current.iter().enumerate() {
			if !self.is_protected(node) {
				continue;
			}
			let slot = wanted
				.iter()
				.enumerate()
				.position(|(index, candidate)| pairs[index].is_none() && same_signature(candidate, node));
			if let Some(index) = slot {
				pairs[index] = Some(node.clone());
				claimed[live_index] = true;
			}
		}

		let mut remaining = current
			.iter()
			.enumerate()
			.filter(|(index, node)| !claimed[*index] && !self.is_protected(node))
			.map(|(_, node)| node.clone());
		for slot in pairs.iter_mut().filter(|slot| slot.is_none()) {
			match remaining.next() {
				Some(node) => *slot = Some(node),
				None => break,
			}
		}

		for node in &current {
			let kept = pairs.iter().flatten().any(|paired| paired.is_same_node(node));
			if !kept {
				live.remove_child(node);
				self.stats.removed += 1;
			}
		}

		for (index, (wanted_node, paired)) in wanted.iter().zip(pairs).enumerate() {
			match paired {
				Some(node) if self.is_protected(&node) => self.place(live, &node, index),
				Some(node) if is_compatible(wanted_node, &node) => {
					self.place(live, &node, index);
					self.patch(wanted_node, &node);
				}
				Some(node) => {
					let replacement = wanted_node.deep_clone();
					check(live.replace_child(&replacement, &node));
					self.stats.replaced += 1;
					self.place(live, &replacement, index);
				}
				None => {
					let reference = live.child_at(index);
					check(live.insert_before(&wanted_node.deep_clone(), reference.as_ref()));
					self.stats.inserted += 1;
				}
			}
		}
	}

	fn place(&mut self, parent: &Node, node: &Node, index: usize) {
		let reference = parent.child_at(index);
		if reference.as_ref().is_some_and(|current| current.is_same_node(node)) {
			return;
		}
		check(parent.insert_before(node, reference.as_ref()));
		self.stats.moved += 1;
	}
}

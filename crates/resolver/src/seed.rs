//! Cache seeding from ancestors ("hot-swap").
//!
//! A freshly built node that starts with an empty cache imports every symbol
//! the host already materialized along its parent chain. Siblings built after
//! their parent resolved a name therefore see the parent's instance instead
//! of locating their own copy.

use tracing::debug;

use crate::instrument::Instrumentation;
use crate::resolve::ParentRef;
use crate::symbol::SymbolRef;

/// Walks the chain from `parent` upward and feeds each ancestor's resolved
/// symbols to `insert`.
///
/// The node being seeded is not visited. `insert` returns whether the name
/// was new; nearer ancestors are visited first, so with a write-once cache
/// the nearest ancestor's instance wins. Returns the number of names added.
pub fn seed_from_ancestors<F>(parent: Option<&ParentRef>, instrumentation: &dyn Instrumentation, mut insert: F) -> usize
where
	F: FnMut(&str, SymbolRef) -> bool,
{
	let mut added = 0;
	let mut depth = 0usize;
	let mut current = parent.cloned();
	while let Some(ancestor) = current {
		for symbol in instrumentation.enumerate_resolved(ancestor.as_ref()) {
			let name = symbol.name().to_string();
			if insert(&name, symbol) {
				added += 1;
			}
		}
		depth += 1;
		current = ancestor.parent().cloned();
	}
	if added > 0 {
		debug!(added, depth, "seed.from_ancestors");
	}
	added
}

//! Taxonomy flattening.
//!
//! Reduces the grouped STIG taxonomy returned by Code Dx into flat
//! categories keyed by STIG name, one per severity tier.

use crate::error::{ReportError, Result};
use crate::models::{Category, FilterDescriptor, TaxonomyNode, Tier};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use tracing::{debug, warn};

/// What to do when two leaves normalize to the same STIG name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Keep the leaf processed first.
    FirstWins,
    /// Keep the leaf processed last.
    #[default]
    LastWins,
    /// Fail the run.
    Reject,
}

/// Flatten a subtree into a category of leaf descriptors.
///
/// Uses an explicit LIFO work stack seeded with `root_children`, so nesting
/// depth is bounded only by memory. Leaves are processed in stack order,
/// which is what `policy` refers to by "first" and "last".
pub fn flatten(root_children: &[TaxonomyNode], policy: CollisionPolicy) -> Result<Category> {
    let mut category = Category::new();
    let mut stack: Vec<&TaxonomyNode> = root_children.iter().collect();

    while let Some(node) = stack.pop() {
        if !node.is_leaf() {
            stack.extend(node.children.iter().flatten());
            continue;
        }

        let descriptor = FilterDescriptor::from_leaf(node);
        match category.entry(descriptor.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(descriptor);
            }
            Entry::Occupied(mut slot) => match policy {
                CollisionPolicy::FirstWins => {
                    debug!(
                        "Ignoring duplicate category {} ({})",
                        descriptor.name, descriptor.filter_id
                    );
                }
                CollisionPolicy::LastWins => {
                    debug!(
                        "Replacing duplicate category {} ({} -> {})",
                        descriptor.name,
                        slot.get().filter_id,
                        descriptor.filter_id
                    );
                    slot.insert(descriptor);
                }
                CollisionPolicy::Reject => {
                    return Err(ReportError::DuplicateCategory {
                        name: descriptor.name,
                        first: slot.get().filter_id.clone(),
                        second: descriptor.filter_id,
                    });
                }
            },
        }
    }

    Ok(category)
}

/// Locate the children of each tier subtree under the taxonomy root.
///
/// Tiers are matched by label (`CAT I`, ...). When no child of the root
/// carries a tier label, the first three children are taken positionally.
/// A tier whose node is missing or has no children yields `None`.
pub fn tier_subtrees(taxonomy: &[TaxonomyNode]) -> [Option<&[TaxonomyNode]>; 3] {
    let Some(root) = taxonomy.first() else {
        warn!("Taxonomy is empty");
        return [None, None, None];
    };

    let tiers = root.children.as_deref().unwrap_or(&[]);
    let labelled = tiers
        .iter()
        .any(|node| Tier::ALL.iter().any(|t| node.name.trim() == t.label()));

    Tier::ALL.map(|tier| {
        let node = if labelled {
            tiers.iter().find(|node| node.name.trim() == tier.label())
        } else {
            tiers.get(tier.index())
        };
        node.and_then(|n| n.children.as_deref())
    })
}

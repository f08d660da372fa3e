//! Template expansion.
//!
//! Walks a template tree, and replaces every anchor element (by default
//! `<CodeDx content="..."/>`) with the output of the generator registered for
//! its content key. Generated elements take the anchor's position under the
//! same parent and are not themselves scanned for anchors.

use super::content::ContentKind;
use super::element::Element;
use super::generators::{generator_for, GenerationContext, RunContext};
use crate::error::{ReportError, Result};
use crate::models::Aggregation;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Element name that marks an anchor.
pub const DEFAULT_ANCHOR_TAG: &str = "CodeDx";

/// Attribute holding an anchor's content key.
pub const CONTENT_ATTRIBUTE: &str = "content";

/// Summary of one assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Anchors replaced.
    pub anchors: usize,
    /// Top-level elements inserted in place of anchors.
    pub generated: usize,
    pub by_kind: BTreeMap<ContentKind, usize>,
}

/// Expands anchors in a template.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    anchor_tag: String,
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_ANCHOR_TAG)
    }
}

impl DocumentAssembler {
    pub fn new(anchor_tag: impl Into<String>) -> Self {
        Self {
            anchor_tag: anchor_tag.into(),
        }
    }

    /// Replace every anchor under `root`.
    ///
    /// Stops at the first anchor with a missing or unknown content key.
    /// Anchors expanded before the failure remain expanded in `root`.
    pub fn assemble(
        &self,
        root: &mut Element,
        aggregation: &Aggregation,
        run: &RunContext,
    ) -> Result<AssemblyStats> {
        if root.name == self.anchor_tag {
            warn!("Template root is itself an anchor; it is left unchanged");
        }

        debug!(
            "Template has {} <{}> anchors",
            root.descendants_named(&self.anchor_tag).len(),
            self.anchor_tag
        );

        let mut stats = AssemblyStats::default();
        self.expand(root, aggregation, run, &mut stats)?;
        debug!(
            "Expanded {} anchors into {} elements",
            stats.anchors, stats.generated
        );
        Ok(stats)
    }

    fn expand(
        &self,
        parent: &mut Element,
        aggregation: &Aggregation,
        run: &RunContext,
        stats: &mut AssemblyStats,
    ) -> Result<()> {
        let mut index = 0;

        while index < parent.children.len() {
            if parent.children[index].name != self.anchor_tag {
                self.expand(&mut parent.children[index], aggregation, run, stats)?;
                index += 1;
                continue;
            }

            let kind = self.content_kind(parent, &parent.children[index])?;
            let generated = {
                let ctx = GenerationContext {
                    parent: &*parent,
                    aggregation,
                    run,
                };
                debug!("Expanding {} under <{}>", kind, ctx.parent.name);
                generator_for(kind).generate(&ctx)
            };

            let count = generated.len();
            parent.children.splice(index..=index, generated);
            index += count;

            stats.anchors += 1;
            stats.generated += count;
            *stats.by_kind.entry(kind).or_default() += 1;
        }

        Ok(())
    }

    fn content_kind(&self, parent: &Element, anchor: &Element) -> Result<ContentKind> {
        let key = anchor.attr(CONTENT_ATTRIBUTE).ok_or_else(|| {
            ReportError::MissingContent(format!("<{}> in <{}>", self.anchor_tag, parent.name))
        })?;
        key.parse()
    }
}

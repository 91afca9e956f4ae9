//! # Post-Effect System
//!
//! Every successful mutation is followed by a fixed set of clean-up passes
//! that restore document-wide invariants the mutation itself does not look
//! at:
//!
//! - placeholders: one per empty content container, none next to content
//! - orphan rules: generated-class rules whose element no longer exists
//!
//! Effects run on the working copy before it is serialized, so they commit
//! together with the mutation that triggered them.

use mailcanvas_dom::markers::GENERATED_PREFIX;
use tracing::debug;

use crate::document::Document;
use crate::mutations::Mutation;
use crate::placeholder;
use crate::scope::root_scope;

/// Clean-up pass triggered by a mutation
pub trait PostEffect: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Repair the document; returns whether anything changed
    fn apply(&self, mutation: &Mutation, doc: &mut Document, placeholder_text: &str) -> bool;
}

/// Reconcile placeholders across the root scope
#[derive(Debug)]
pub struct NormalizePlaceholders;

impl PostEffect for NormalizePlaceholders {
    fn name(&self) -> &'static str {
        "normalize-placeholders"
    }

    fn apply(&self, _mutation: &Mutation, doc: &mut Document, placeholder_text: &str) -> bool {
        let Some(root) = root_scope(doc.tree()) else {
            return false;
        };
        placeholder::normalize(doc.tree_mut(), root, placeholder_text)
    }
}

/// Drop `.mc-el-*` rules that no element carries anymore
#[derive(Debug)]
pub struct CleanupOrphanRules;

impl PostEffect for CleanupOrphanRules {
    fn name(&self) -> &'static str {
        "cleanup-orphan-rules"
    }

    fn apply(&self, mutation: &Mutation, doc: &mut Document, _placeholder_text: &str) -> bool {
        // Only structural removals and rewrites can orphan a rule
        if !matches!(mutation, Mutation::Remove { .. } | Mutation::SetText { .. }) {
            return false;
        }

        let mut sheet = doc.stylesheet();
        let orphans: Vec<String> = sheet
            .rules()
            .filter_map(|rule| {
                let class = rule.selector.strip_prefix('.')?;
                let orphaned = class.starts_with(GENERATED_PREFIX)
                    && !doc.tree().identity_in_use(class);
                orphaned.then(|| rule.selector.clone())
            })
            .collect();
        if orphans.is_empty() {
            return false;
        }
        for selector in &orphans {
            sheet.remove(selector);
        }
        debug!(count = orphans.len(), "Removed orphan rules");
        doc.store_stylesheet(&sheet);
        true
    }
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(NormalizePlaceholders), Box::new(CleanupOrphanRules)],
        }
    }

    /// Run every effect in registration order; returns the names of those that changed something
    pub fn run(&self, mutation: &Mutation, doc: &mut Document, placeholder_text: &str) -> Vec<&'static str> {
        self.effects
            .iter()
            .filter(|effect| effect.apply(mutation, doc, placeholder_text))
            .map(|effect| effect.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

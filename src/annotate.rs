use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::matching::BlockPair;
use crate::model::{BlockKey, Layout};
use crate::store::Template;

/// Returns a copy of `layout` with `label` on the block keyed `key`.
/// A blank label clears the annotation.
pub fn annotate(layout: &Layout, key: BlockKey, label: &str) -> CoreResult<Layout> {
    let mut updated = layout.clone();
    let block = updated
        .blocks
        .iter_mut()
        .find(|block| block.key() == key)
        .ok_or_else(|| CoreError::AnnotationTargetMissing(key.to_string()))?;

    let label = label.trim();
    block.annotation = if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    };

    Ok(updated)
}

/// Copies annotations from `source` onto the paired blocks of `layout`.
/// Unpaired blocks keep whatever they had.
pub fn transplant(layout: &Layout, source: &Template, pairs: &[BlockPair]) -> Layout {
    let source_labels = source
        .layout
        .blocks
        .iter()
        .filter_map(|block| block.annotation.as_ref().map(|label| (block.key(), label)))
        .collect::<HashMap<BlockKey, &String>>();

    let targets = pairs
        .iter()
        .filter_map(|pair| {
            source_labels
                .get(&pair.template_key)
                .map(|label| (pair.candidate_key, (*label).clone()))
        })
        .collect::<HashMap<BlockKey, String>>();

    let mut updated = layout.clone();
    for block in &mut updated.blocks {
        if let Some(label) = targets.get(&block.key()) {
            block.annotation = Some(label.clone());
        }
    }
    updated
}

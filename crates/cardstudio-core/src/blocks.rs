//! Top-level structural blocks (slides) and their reordering.

use crate::surface::{NodeId, Surface};
use serde::{Deserialize, Serialize};

/// Read view of one top-level block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralBlock {
    pub index: usize,
    pub node: NodeId,
    pub display_title: String,
}

/// Direction of an index-adjacent move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NudgeDirection {
    Up,
    Down,
}

impl NudgeDirection {
    /// Neighbour index, if there is one.
    pub fn target(self, index: usize, len: usize) -> Option<usize> {
        match self {
            NudgeDirection::Up => index.checked_sub(1),
            NudgeDirection::Down => (index + 1 < len).then_some(index + 1),
        }
    }
}

/// Derive the block list from the surface's top-level elements.
pub fn derive_blocks(surface: &Surface, title_max_chars: usize) -> Vec<StructuralBlock> {
    surface
        .element_roots()
        .into_iter()
        .enumerate()
        .map(|(index, node)| StructuralBlock {
            index,
            node,
            display_title: block_title(surface, node, title_max_chars)
                .unwrap_or_else(|| format!("Slide {}", index + 1)),
        })
        .collect()
}

/// Title from the first heading-like descendant.
fn block_title(surface: &Surface, block: NodeId, max_chars: usize) -> Option<String> {
    let heading = surface
        .descendants(block)
        .into_iter()
        .find(|&id| surface.element(id).is_some_and(|el| el.is_heading_like()))?;
    let text = decode_entities(&surface.text_content(heading));
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(max_chars).collect())
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Move the block at `from` next to the block currently at `to`.
///
/// Moving forward lands after the target, moving backward lands before
/// it, so the moved block ends up at index `to` either way. Returns false
/// (and leaves the surface alone) for out-of-range or equal indices.
pub fn move_block(surface: &mut Surface, from: usize, to: usize) -> bool {
    let blocks = surface.element_roots();
    if from == to || from >= blocks.len() || to >= blocks.len() {
        return false;
    }
    let moving = blocks[from];
    let reference = blocks[to];
    let roots = surface.roots_mut();
    roots.retain(|&id| id != moving);
    let Some(pos) = roots.iter().position(|&id| id == reference) else {
        return false;
    };
    let insert_at = if from < to { pos + 1 } else { pos };
    roots.insert(insert_at, moving);
    log::debug!("Moved block {} -> {}", from, to);
    true
}

/// An in-flight block drag carrying its source index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDrag {
    pub source: usize,
}

/// The block list shown in the side panel plus any block drag.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    blocks: Vec<StructuralBlock>,
    drag: Option<BlockDrag>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive from the surface. The list is never patched in place.
    pub fn refresh(&mut self, surface: &Surface, title_max_chars: usize) {
        self.blocks = derive_blocks(surface, title_max_chars);
        if self.drag.is_some_and(|d| d.source >= self.blocks.len()) {
            self.drag = None;
        }
    }

    pub fn blocks(&self) -> &[StructuralBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn begin_drag(&mut self, source: usize) -> bool {
        if source >= self.blocks.len() {
            return false;
        }
        self.drag = Some(BlockDrag { source });
        true
    }

    pub fn drag(&self) -> Option<BlockDrag> {
        self.drag
    }

    /// End the drag over `target`, yielding the `(from, to)` move.
    pub fn drop_on(&mut self, target: usize) -> Option<(usize, usize)> {
        let drag = self.drag.take()?;
        Some((drag.source, target))
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }
}

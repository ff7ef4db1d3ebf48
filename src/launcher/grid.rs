/// Number of icon slots visible at once.
pub const VISIBLE_SLOTS: i32 = 5;
/// Visual slot the selected item is pinned to.
pub const SELECTION_SLOT: i32 = 2;

/// Horizontal game grid. `scroll_offset` is the logical offset used for
/// bounds decisions; `animated_scroll_offset` eases toward the target every
/// tick and is only used for drawing.
#[derive(Debug)]
pub struct GameGrid {
    selected_index: i32,
    scroll_offset: i32,
    target_scroll_offset: i32,
    animated_scroll_offset: f32,
    item_count: usize,
}

/// Where one visual slot lands this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPlacement {
    pub slot: i32,
    pub x: f32,
    /// `None` when the slot has no item but still occupies its position
    pub item: Option<usize>,
}

impl Default for GameGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl GameGrid {
    /// Fraction of the remaining distance covered per tick.
    const ANIMATION_SPEED: f32 = 0.3;
    const SNAP_DISTANCE: f32 = 0.01;

    pub fn new() -> GameGrid {
        // first item starts in the selection slot
        return GameGrid {
            selected_index: 0,
            scroll_offset: -SELECTION_SLOT,
            target_scroll_offset: -SELECTION_SLOT,
            animated_scroll_offset: -SELECTION_SLOT as f32,
            item_count: 0,
        };
    }

    pub fn selected_index(&self) -> i32 {
        self.selected_index
    }

    pub fn scroll_offset(&self) -> i32 {
        self.scroll_offset
    }

    pub fn animated_scroll_offset(&self) -> f32 {
        self.animated_scroll_offset
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Updates the number of items and re-clamps the selection.
    pub fn set_item_count(&mut self, count: usize) {
        self.item_count = count;
        self.set_selected_index(self.selected_index);
    }

    fn count(&self) -> i32 {
        self.item_count.min(i32::MAX as usize) as i32
    }

    pub fn set_selected_index(&mut self, index: i32) {
        let count = self.count();
        let mut index = index;
        if count > 0 && index >= count {
            index = count - 1;
        }
        if index < 0 || count == 0 {
            index = 0;
        }
        self.selected_index = index;

        let desired = index - SELECTION_SLOT;
        let target = if count > 0 {
            let max_scroll = count - 1 - SELECTION_SLOT;
            // short lists do not reserve lead-in space
            let min_scroll = if count <= VISIBLE_SLOTS && count < 3 {
                0
            } else {
                -SELECTION_SLOT
            };
            // min wins over max when the list is shorter than the lead-in
            if desired < min_scroll {
                min_scroll
            } else if desired > max_scroll {
                max_scroll
            } else {
                desired
            }
        } else {
            desired.max(-SELECTION_SLOT)
        };

        self.target_scroll_offset = target;
        self.scroll_offset = target;
    }

    /// Advances the scroll animation by one frame.
    pub fn tick(&mut self) {
        let diff = self.target_scroll_offset as f32 - self.animated_scroll_offset;
        if diff.abs() > Self::SNAP_DISTANCE {
            self.animated_scroll_offset += diff * Self::ANIMATION_SPEED;
        } else {
            self.animated_scroll_offset = self.target_scroll_offset as f32;
        }
    }

    pub fn move_left(&mut self) {
        if self.selected_index > 0 {
            self.set_selected_index(self.selected_index - 1);
        }
    }

    pub fn move_right(&mut self) {
        if self.selected_index < self.count() - 1 {
            self.set_selected_index(self.selected_index + 1);
        }
    }

    pub fn page_left(&mut self) {
        self.set_selected_index((self.selected_index - VISIBLE_SLOTS).max(0));
    }

    pub fn page_right(&mut self) {
        self.set_selected_index(self.selected_index + VISIBLE_SLOTS);
    }

    /// Screen placement of every visual slot, computed from the animated
    /// offset. Item identities follow the rounded animated offset, so they
    /// can trail the logical offset by one while the grid is moving.
    pub fn slot_placements(&self, start_x: f32, spacing: f32) -> Vec<SlotPlacement> {
        let drift = self.animated_scroll_offset - self.scroll_offset as f32;
        let first_item = self.animated_scroll_offset.round() as i64;

        (0..VISIBLE_SLOTS)
            .map(|slot| {
                let absolute = first_item + slot as i64;
                let item = if absolute >= 0 && (absolute as u64) < self.item_count as u64 {
                    Some(absolute as usize)
                } else {
                    None
                };
                SlotPlacement {
                    slot,
                    x: start_x + slot as f32 * spacing + drift * spacing,
                    item,
                }
            })
            .collect()
    }
}

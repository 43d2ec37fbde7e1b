//! Board DragDrop Utilities
//!
//! Drag gesture tracking for kanban columns, independent of any UI toolkit.
//! Uses movement threshold to distinguish click from drag.

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;

/// A position on the board: column label plus zero-based index in it
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    pub column: String,
    pub index: usize,
}

impl Slot {
    pub fn new(column: impl Into<String>, index: usize) -> Self {
        Self {
            column: column.into(),
            index,
        }
    }
}

/// Drop target: a zone inside a column where the card would land
pub type DropTarget = Slot;

/// Result of releasing a drag
#[derive(Clone, Debug, PartialEq)]
pub struct DropEvent<Id> {
    pub card_id: Id,
    pub source: Slot,
    /// `None` when released outside every column
    pub destination: Option<Slot>,
}

impl<Id> DropEvent<Id> {
    pub fn new(card_id: Id, source: Slot, destination: Option<Slot>) -> Self {
        Self {
            card_id,
            source,
            destination,
        }
    }
}

/// Where the gesture currently is
#[derive(Clone, Debug, PartialEq)]
pub enum GestureState<Id> {
    Idle,
    /// Pointer is down on a card but has not moved past the threshold
    Pending { card_id: Id, origin: Slot, start: (i32, i32) },
    Dragging { card_id: Id, origin: Slot },
}

/// Tracks one pointer through press, move, hover and release
#[derive(Clone, Debug)]
pub struct DragTracker<Id> {
    state: GestureState<Id>,
    drop_target: Option<DropTarget>,
    threshold: i32,
}

impl<Id: Clone> Default for DragTracker<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Clone> DragTracker<Id> {
    pub fn new() -> Self {
        Self::with_threshold(DRAG_THRESHOLD_PX)
    }

    pub fn with_threshold(threshold: i32) -> Self {
        Self {
            state: GestureState::Idle,
            drop_target: None,
            threshold,
        }
    }

    pub fn state(&self) -> &GestureState<Id> {
        &self.state
    }

    /// Card being dragged, if a drag has started
    pub fn dragging(&self) -> Option<&Id> {
        match &self.state {
            GestureState::Dragging { card_id, .. } => Some(card_id),
            _ => None,
        }
    }

    pub fn drop_target(&self) -> Option<&DropTarget> {
        self.drop_target.as_ref()
    }

    /// Primary button went down on a card: record a pending drag
    pub fn press(&mut self, card_id: Id, origin: Slot, x: i32, y: i32) {
        self.state = GestureState::Pending {
            card_id,
            origin,
            start: (x, y),
        };
        self.drop_target = None;
    }

    /// Pointer moved; starts dragging once it travelled past the threshold
    pub fn pointer_move(&mut self, x: i32, y: i32) {
        let started = match &self.state {
            GestureState::Pending { card_id, origin, start } => {
                let dx = (x - start.0).abs();
                let dy = (y - start.1).abs();
                (dx > self.threshold || dy > self.threshold).then(|| GestureState::Dragging {
                    card_id: card_id.clone(),
                    origin: origin.clone(),
                })
            }
            _ => None,
        };
        if let Some(state) = started {
            self.state = state;
        }
    }

    /// Pointer entered a drop zone
    pub fn enter(&mut self, target: DropTarget) {
        if self.dragging().is_some() {
            self.drop_target = Some(target);
        }
    }

    /// Pointer left the current drop zone
    pub fn leave(&mut self) {
        if self.dragging().is_some() {
            self.drop_target = None;
        }
    }

    /// Button released. Returns a drop only if a drag had actually started;
    /// a release without movement is a click.
    pub fn release(&mut self) -> Option<DropEvent<Id>> {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        let target = self.drop_target.take();
        match state {
            GestureState::Dragging { card_id, origin } => {
                Some(DropEvent::new(card_id, origin, target))
            }
            _ => None,
        }
    }

    /// Abandon any gesture in progress
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
        self.drop_target = None;
    }
}

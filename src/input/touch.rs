//! Raw multi-pointer touch events

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchAction {
    /// First pointer went down
    Down,
    Move,
    /// Last pointer went up
    Up,
    /// An additional pointer went down
    PointerDown,
    /// A pointer other than the last one went up
    PointerUp,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// One touch event with every pointer currently on the surface
///
/// `action_index` names the pointer a `PointerDown`/`PointerUp` refers to.
/// `time` is measured on the monotonic clock of the recognizer receiving it.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub pointers: Vec<Pointer>,
    pub action_index: usize,
    pub time: Duration,
}

impl TouchEvent {
    pub fn new(
        action: TouchAction,
        pointers: Vec<Pointer>,
        action_index: usize,
        time: Duration,
    ) -> Self {
        Self {
            action,
            pointers,
            action_index,
            time,
        }
    }

    /// Single-pointer event
    pub fn single(action: TouchAction, x: f32, y: f32, time: Duration) -> Self {
        Self::new(action, vec![Pointer { id: 0, x, y }], 0, time)
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// First pointer's position
    pub fn position(&self) -> (f32, f32) {
        self.pointers
            .first()
            .map(|p| (p.x, p.y))
            .unwrap_or((0.0, 0.0))
    }

    /// Centroid of the pointers that stay down after this event
    pub fn focus(&self) -> (f32, f32) {
        let skip = match self.action {
            TouchAction::PointerUp => Some(self.action_index),
            _ => None,
        };

        let (mut sum_x, mut sum_y, mut count) = (0.0f32, 0.0f32, 0usize);
        for (i, p) in self.pointers.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            sum_x += p.x;
            sum_y += p.y;
            count += 1;
        }

        if count == 0 {
            return self.position();
        }
        (sum_x / count as f32, sum_y / count as f32)
    }
}

use crate::hid::MouseButton;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One button transition waiting to be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEdge {
    pub button: MouseButton,
    pub pressed: bool,
}

/// FIFO of button edges shared between the event side and the output tick
///
/// Clones share the same queue. At most one edge is drained per report.
#[derive(Debug, Clone, Default)]
pub struct PendingButtonQueue {
    inner: Arc<Mutex<VecDeque<ButtonEdge>>>,
}

impl PendingButtonQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, button: MouseButton, pressed: bool) {
        self.lock().push_back(ButtonEdge { button, pressed });
    }

    pub fn pop(&self) -> Option<ButtonEdge> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ButtonEdge>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Persistent pressed state of the three buttons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonLatch {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl ButtonLatch {
    pub fn apply(&mut self, edge: ButtonEdge) {
        match edge.button {
            MouseButton::Left => self.left = edge.pressed,
            MouseButton::Right => self.right = edge.pressed,
            MouseButton::Middle => self.middle = edge.pressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_fifo() {
        let queue = PendingButtonQueue::new();
        let producer = queue.clone();
        producer.push(MouseButton::Left, true);
        producer.push(MouseButton::Right, false);

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.pop(),
            Some(ButtonEdge {
                button: MouseButton::Left,
                pressed: true
            })
        );
        assert_eq!(queue.pop().map(|e| e.button), Some(MouseButton::Right));
        assert!(producer.is_empty());
    }

    #[test]
    fn latch_keeps_state_until_next_edge() {
        let mut latch = ButtonLatch::default();
        latch.apply(ButtonEdge {
            button: MouseButton::Middle,
            pressed: true,
        });
        latch.apply(ButtonEdge {
            button: MouseButton::Left,
            pressed: false,
        });
        assert_eq!(
            latch,
            ButtonLatch {
                left: false,
                right: false,
                middle: true
            }
        );
    }
}

//! Bounded segment queue.
//!
//! Fixed-capacity ring buffer storing segments by value. The slot arena
//! is allocated once at planner creation; nothing in the queue
//! allocates afterwards, so the real-time consumer never touches the
//! heap. Single producer (the Add* path), single consumer (the cycle
//! driver); the look-ahead optimiser additionally walks indices from
//! the tail backwards.

use crate::segment::Segment;

/// Bounded FIFO of motion segments with O(1) indexed access.
#[derive(Debug)]
pub struct SegmentQueue {
    slots: Box<[Option<Segment>]>,
    head: usize,
    len: usize,
}

impl SegmentQueue {
    /// Allocate the slot arena. Capacity is fixed for the queue's
    /// lifetime.
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity.max(1)).map(|_| None).collect();
        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Free slots remaining.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        (self.head + i) % self.capacity()
    }

    /// Append a segment; hands it back when the queue is full.
    pub fn put(&mut self, tc: Segment) -> Result<(), Segment> {
        if self.is_full() {
            return Err(tc);
        }
        let at = self.slot(self.len);
        self.slots[at] = Some(tc);
        self.len += 1;
        Ok(())
    }

    /// Remove and return the head element.
    pub fn pop_front(&mut self) -> Option<Segment> {
        if self.is_empty() {
            return None;
        }
        let tc = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        tc
    }

    /// Remove and return the most recently appended element.
    pub fn pop_back(&mut self) -> Option<Segment> {
        if self.is_empty() {
            return None;
        }
        let at = self.slot(self.len - 1);
        self.len -= 1;
        self.slots[at].take()
    }

    /// Element `i` positions behind the head.
    pub fn item(&self, i: usize) -> Option<&Segment> {
        if i >= self.len {
            return None;
        }
        self.slots[self.slot(i)].as_ref()
    }

    /// Mutable access to element `i`.
    pub fn item_mut(&mut self, i: usize) -> Option<&mut Segment> {
        if i >= self.len {
            return None;
        }
        let at = self.slot(i);
        self.slots[at].as_mut()
    }

    /// Mutable access to the most recently appended element.
    pub fn last_mut(&mut self) -> Option<&mut Segment> {
        if self.is_empty() {
            return None;
        }
        self.item_mut(self.len - 1)
    }

    /// Mutable access to the head and the element behind it at once.
    /// Needed while blending, when both are advanced in the same tick.
    pub fn front_pair_mut(&mut self) -> (Option<&mut Segment>, Option<&mut Segment>) {
        match self.len {
            0 => (None, None),
            1 => {
                let at = self.head;
                (self.slots[at].as_mut(), None)
            }
            _ => {
                let i = self.head;
                let j = (self.head + 1) % self.capacity();
                // i != j because capacity >= len >= 2
                if i < j {
                    let (lo, hi) = self.slots.split_at_mut(j);
                    (lo[i].as_mut(), hi[0].as_mut())
                } else {
                    let (lo, hi) = self.slots.split_at_mut(i);
                    (hi[0].as_mut(), lo[j].as_mut())
                }
            }
        }
    }

    /// Drop all contents without releasing the arena.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

//! Triple-buffer role rotation.
//!
//! Three color buffers are allocated once. Roles are indices into that fixed
//! array, so rotating a frame swaps two pairs of `usize`s and never moves
//! pixel data:
//!
//! ```text
//!            Write  Settled  Display
//! start        0       1        2
//! end_frame    1       2        0
//! end_frame    2       0        1
//! end_frame    0       1        2
//! ```

use log::trace;

use super::framebuffer::FrameBuffer;

/// The job a slot currently has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    /// Target of the frame being rasterized. Never read by consumers.
    Write,
    /// The previous Display, waiting to become the next Write target.
    Settled,
    /// Most recently completed frame; safe to read.
    Display,
}

pub struct TripleBuffer {
    slots: [FrameBuffer; 3],
    write: usize,
    settled: usize,
    display: usize,
    rotations: u64,
}

impl TripleBuffer {
    pub fn new(width: u32, height: u32, clear_color: u32) -> Self {
        Self {
            slots: [
                FrameBuffer::new(width, height, clear_color),
                FrameBuffer::new(width, height, clear_color),
                FrameBuffer::new(width, height, clear_color),
            ],
            write: 0,
            settled: 1,
            display: 2,
            rotations: 0,
        }
    }

    /// Promote the finished Write buffer to Display.
    ///
    /// Swaps Write with Settled, then Settled with Display: the old Settled
    /// becomes the next Write target and the old Display becomes Settled.
    pub fn end_frame(&mut self) {
        std::mem::swap(&mut self.write, &mut self.settled);
        std::mem::swap(&mut self.settled, &mut self.display);
        self.rotations += 1;
        trace!(
            "rotation {}: write={} settled={} display={}",
            self.rotations,
            self.write,
            self.settled,
            self.display
        );
    }

    /// Number of `end_frame` calls so far.
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    pub fn write_index(&self) -> usize {
        self.write
    }

    pub fn settled_index(&self) -> usize {
        self.settled
    }

    pub fn display_index(&self) -> usize {
        self.display
    }

    pub fn role_of(&self, slot: usize) -> Option<SlotRole> {
        match slot {
            s if s == self.write => Some(SlotRole::Write),
            s if s == self.settled => Some(SlotRole::Settled),
            s if s == self.display => Some(SlotRole::Display),
            _ => None,
        }
    }

    pub fn write_mut(&mut self) -> &mut FrameBuffer {
        &mut self.slots[self.write]
    }

    pub fn settled(&self) -> &FrameBuffer {
        &self.slots[self.settled]
    }

    pub fn display(&self) -> &FrameBuffer {
        &self.slots[self.display]
    }

    pub fn display_mut(&mut self) -> &mut FrameBuffer {
        &mut self.slots[self.display]
    }

    /// Borrow the Write slot mutably and the Display slot shared, at once.
    ///
    /// Lets a second stage read the last finished frame while the next one
    /// is being rasterized.
    pub fn write_and_display(&mut self) -> (&mut FrameBuffer, &FrameBuffer) {
        let (write, display) = (self.write, self.display);
        let mut write_slot = None;
        let mut display_slot = None;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i == write {
                write_slot = Some(slot);
            } else if i == display {
                display_slot = Some(&*slot);
            }
        }
        match (write_slot, display_slot) {
            (Some(w), Some(d)) => (w, d),
            _ => unreachable!("write and display always name distinct slots"),
        }
    }
}

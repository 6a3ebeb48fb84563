//! Global allocator
//!
//! This module is the only place in the firmware that touches the heap
//! memory directly. The CoAP codec builds its messages in `alloc::vec::Vec`,
//! so a small first-fit heap backs it.
//!
//! # Budget
//!
//! ```text
//! Heap (8 KB, main SRAM):
//! ├─ Outgoing CoAP message:    ≤128 B
//! ├─ Parsed response packet:   ≤128 B + options
//! └─ Allocator bookkeeping
//! ```

#![allow(unsafe_code)]

use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_alloc::LlffHeap as Heap;

const HEAP_SIZE: usize = 8 * 1024;

#[global_allocator]
static HEAP: Heap = Heap::empty();

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Hand the heap region to the allocator
///
/// Must run before the first allocation. Later calls do nothing.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::AcqRel) {
        return;
    }

    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    // SAFETY: guarded above, so the region is handed over exactly once and
    // nothing else references HEAP_MEM.
    unsafe { HEAP.init(&raw mut HEAP_MEM as usize, HEAP_SIZE) }
}

/// Bytes currently allocated
pub fn used() -> usize {
    HEAP.used()
}

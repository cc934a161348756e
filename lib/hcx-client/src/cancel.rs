/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Something an aborted request has to stop, like a pending lease or a leased connection.
pub trait Cancellable: Send + Sync {
    /// Returns whether this call did cancel anything.
    fn cancel(&self) -> bool;
}

#[derive(Default)]
struct CancelSlot {
    occupant: Option<Arc<dyn Cancellable>>,
    aborted: bool,
}

/// Abort handle of one logical request.
///
/// It holds at most one cancellable occupant at a time, and once aborted stays
/// aborted until [`CancelToken::reset`]. Any thread may abort while the request
/// is executing, the occupant is cancelled exactly once.
#[derive(Default)]
pub struct CancelToken {
    slot: Mutex<CancelSlot>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    fn lock(&self) -> MutexGuard<'_, CancelSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the request as aborted and cancel the current occupant.
    ///
    /// Returns `false` if it was already aborted.
    pub fn abort(&self) -> bool {
        let occupant = {
            let mut slot = self.lock();
            if slot.aborted {
                return false;
            }
            slot.aborted = true;
            slot.occupant.take()
        };
        if let Some(occupant) = occupant {
            occupant.cancel();
        }
        true
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// Install a new occupant.
    ///
    /// A replaced occupant is cancelled. If the token has already been aborted,
    /// the new occupant is cancelled right away instead of being installed.
    pub fn set_cancellable(&self, cancellable: Arc<dyn Cancellable>) {
        let previous = {
            let mut slot = self.lock();
            if slot.aborted {
                None
            } else {
                Some(slot.occupant.replace(cancellable.clone()))
            }
        };
        match previous {
            None => {
                cancellable.cancel();
            }
            Some(Some(previous)) => {
                if !std::ptr::addr_eq(Arc::as_ptr(&previous), Arc::as_ptr(&cancellable)) {
                    previous.cancel();
                }
            }
            Some(None) => {}
        }
    }

    /// Clear the aborted mark for reuse, cancelling any remaining occupant.
    pub fn reset(&self) {
        let occupant = {
            let mut slot = self.lock();
            slot.aborted = false;
            slot.occupant.take()
        };
        if let Some(occupant) = occupant {
            occupant.cancel();
        }
    }
}

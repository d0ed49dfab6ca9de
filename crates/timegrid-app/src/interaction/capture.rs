use std::fmt;
use std::rc::Rc;

/// Subscription to the pointer-move / pointer-up stream of the host surface.
///
/// A gesture owns the subscription between pointer-down and pointer-up. Hosts
/// attach their listeners in [`acquire`](Self::acquire) and detach them in
/// [`release`](Self::release).
pub trait PointerCapture {
    /// Start routing pointer events to the active gesture.
    fn acquire(&self);
    /// Stop routing pointer events to the active gesture.
    fn release(&self);
}

/// Capture for hosts that always deliver pointer events.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassiveCapture;

impl PointerCapture for PassiveCapture {
    fn acquire(&self) {}

    fn release(&self) {}
}

/// Proof that a gesture holds the pointer capture.
///
/// Dropping the grab releases the capture, so every way out of a gesture
/// (commit, rejection, click, cancel, unwinding) releases it exactly once.
pub struct PointerGrab {
    capture: Rc<dyn PointerCapture>,
}

impl PointerGrab {
    pub(crate) fn acquire(capture: &Rc<dyn PointerCapture>) -> Self {
        capture.acquire();
        Self {
            capture: Rc::clone(capture),
        }
    }
}

impl Drop for PointerGrab {
    fn drop(&mut self) {
        self.capture.release();
    }
}

impl fmt::Debug for PointerGrab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PointerGrab")
    }
}

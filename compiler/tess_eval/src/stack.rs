//! Host stack guard for the recursive structural walks.
//!
//! The trampoline itself never recurses. Deep-cloning and display walk
//! value graphs recursively and compilation walks the expression tree; a long cluster chain or a deeply nested
//! expression can be deeper than the default thread stack.

/// Run `f`, growing the host stack first if it is close to exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Headroom to keep before growing (100KB).
    const RED_ZONE: usize = 100 * 1024;

    /// Size of each new stack segment (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

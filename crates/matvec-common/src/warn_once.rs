//! Rate-limited diagnostics for kernel routing.
//!
//! A SIMD kernel that receives misaligned dimensions falls back to the scalar
//! reference on every call. The first fallback for a given kernel and shape is
//! logged at WARN; repeats drop to DEBUG so hot loops do not flood the log.

use crate::{MatvecShape, SIMD_WIDTH, Traversal};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, OnceLock};

static WARN_REGISTRY: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn registry() -> MutexGuard<'static, HashSet<String>> {
    let registry = WARN_REGISTRY.get_or_init(|| Mutex::new(HashSet::new()));
    // A panic while holding the lock leaves the set intact.
    match registry.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Log `message` at WARN the first time `key` is seen, DEBUG afterwards.
///
/// Returns `true` when this call was the first occurrence.
pub fn warn_once_fn(key: &str, message: &str) -> bool {
    let first = registry().insert(key.to_string());
    if first {
        tracing::warn!(key = %key, "{}", message);
    } else {
        tracing::debug!(key = %key, "(rate-limited) {}", message);
    }
    first
}

/// Whether `key` has already been reported.
pub fn has_warned(key: &str) -> bool {
    registry().contains(key)
}

/// Report that `kernel` could not take its vectorized path for `shape`.
pub fn fallback_notice(kernel: &str, shape: MatvecShape, traversal: Traversal) -> bool {
    let key = fallback_key(kernel, shape, traversal);
    warn_once_fn(
        &key,
        &format!(
            "kernel {kernel} requires dimensions divisible by {SIMD_WIDTH}; \
             falling back to scalar for {shape} ({traversal})"
        ),
    )
}

/// Registry key used by [`fallback_notice`].
pub fn fallback_key(kernel: &str, shape: MatvecShape, traversal: Traversal) -> String {
    format!("fallback:{kernel}:{shape}:{traversal}")
}

/// Format-string front end for [`warn_once_fn`].
#[macro_export]
macro_rules! warn_once {
    ($key:expr, $($arg:tt)*) => {
        $crate::warn_once_fn($key, &format!($($arg)*))
    };
}

#[cfg(test)]
pub(crate) fn clear_registry_for_test() {
    registry().clear();
}

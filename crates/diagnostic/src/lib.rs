//! Precondition-violation reporting shared by the allocators and containers.
//!
//! Misuse of an allocator or container (a null pointer, an out-of-range
//! index, an alignment the allocator cannot honor) is never undefined
//! behavior. It is reported through [`report`], which:
//!
//! 1. logs the violation together with the caller location,
//! 2. hands it to the hook installed with [`set_hook`], if any,
//! 3. traps (panics) when the active [`Policy`] is [`Policy::Trap`].
//!
//! When the violation is suppressed ([`Policy::Log`]), the caller continues
//! with a fallback value or an explicit failure result.
//!
//! The default policy traps in builds with debug assertions and only logs
//! otherwise.
//!
//! ```
//! use diagnostic::{Policy, Violation};
//!
//! diagnostic::set_policy(Policy::Log);
//! let ok = diagnostic::check(3 < 2, Violation::IndexOutOfRange { index: 3, len: 2 });
//! assert!(!ok);
//! ```

#![no_std]

use core::sync::atomic::{AtomicU8, Ordering};

use snafu_utils::Location;
use spin::RwLock;

/// A precondition violated by the caller of an allocator or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[non_exhaustive]
pub enum Violation {
    #[display("null pointer given")]
    NullPointer,
    #[display("index out of range: index={index}, len={len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[display("alignment not supported: align={align}, max={max}")]
    Misaligned { align: usize, max: usize },
    #[display("alignment is not a power of two: align={align}")]
    NotPowerOfTwo { align: usize },
    #[display("pointer does not belong to this allocator: addr={addr:#x}")]
    ForeignPointer { addr: usize },
    #[display("layout exceeds allocator limit: size={size}, align={align}, limit={limit}")]
    InvalidLayout {
        size: usize,
        align: usize,
        limit: usize,
    },
    #[display("capacity exceeded: capacity={capacity}")]
    CapacityExceeded { capacity: usize },
}

/// A reported violation and the location it was reported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub violation: Violation,
    pub location: Location,
}

/// What happens after a violation has been logged and passed to the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Policy {
    /// Panic at the reporting site.
    Trap,
    /// Return to the caller, which falls back to a default or a failure.
    Log,
}

/// Callback invoked for every reported violation.
pub type Hook = fn(&Diagnostic);

const POLICY_DEFAULT: u8 = 0;
const POLICY_TRAP: u8 = 1;
const POLICY_LOG: u8 = 2;

static POLICY: AtomicU8 = AtomicU8::new(POLICY_DEFAULT);
static HOOK: RwLock<Option<Hook>> = RwLock::new(None);

/// Returns the active policy.
#[must_use]
pub fn policy() -> Policy {
    match POLICY.load(Ordering::Relaxed) {
        POLICY_TRAP => Policy::Trap,
        POLICY_LOG => Policy::Log,
        _ if cfg!(debug_assertions) => Policy::Trap,
        _ => Policy::Log,
    }
}

/// Overrides the build-dependent default policy.
pub fn set_policy(policy: Policy) {
    let raw = match policy {
        Policy::Trap => POLICY_TRAP,
        Policy::Log => POLICY_LOG,
    };
    POLICY.store(raw, Ordering::Relaxed);
}

/// Installs `hook`, returning the previously installed one.
pub fn set_hook(hook: Option<Hook>) -> Option<Hook> {
    core::mem::replace(&mut *HOOK.write(), hook)
}

/// Reports `violation` under the active policy.
#[track_caller]
pub fn report(violation: Violation) {
    let diagnostic = Diagnostic {
        violation,
        location: Location::default(),
    };
    dispatch(policy(), &diagnostic);
}

/// Returns `cond`, reporting `violation` when it does not hold.
#[track_caller]
pub fn check(cond: bool, violation: Violation) -> bool {
    if !cond {
        report(violation);
    }
    cond
}

fn dispatch(policy: Policy, diagnostic: &Diagnostic) {
    log::error!(
        "precondition violated: {} at {}",
        diagnostic.violation,
        diagnostic.location
    );
    let hook = *HOOK.read();
    if let Some(hook) = hook {
        hook(diagnostic);
    }
    if policy.is_trap() {
        panic!("precondition violated: {}", diagnostic.violation);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use core::sync::atomic::AtomicUsize;

    use super::*;

    static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_hook(diagnostic: &Diagnostic) {
        if matches!(diagnostic.violation, Violation::NotPowerOfTwo { align: 3 }) {
            HOOK_CALLS.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn test_diagnostic(violation: Violation) -> Diagnostic {
        Diagnostic {
            violation,
            location: Location::default(),
        }
    }

    #[test]
    fn test_log_policy_returns() {
        dispatch(Policy::Log, &test_diagnostic(Violation::NullPointer));
    }

    #[test]
    #[should_panic(expected = "precondition violated: index out of range: index=4, len=2")]
    fn test_trap_policy_panics() {
        dispatch(
            Policy::Trap,
            &test_diagnostic(Violation::IndexOutOfRange { index: 4, len: 2 }),
        );
    }

    #[test]
    fn test_hook_is_called() {
        set_hook(Some(counting_hook));
        dispatch(
            Policy::Log,
            &test_diagnostic(Violation::NotPowerOfTwo { align: 3 }),
        );
        assert!(HOOK_CALLS.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn test_check_passes_through_condition() {
        set_policy(Policy::Log);
        assert!(check(true, Violation::NullPointer));
        assert!(!check(false, Violation::NullPointer));
        assert_eq!(policy(), Policy::Log);
    }

    #[test]
    fn test_display() {
        let v = Violation::Misaligned { align: 64, max: 16 };
        assert_eq!(
            std::format!("{v}"),
            "alignment not supported: align=64, max=16"
        );
    }
}

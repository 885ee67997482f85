//! Scoped execution-limit adjustment around serialization.
//!
//! Writing a document with very many pages can drive a PDF library through
//! deep nested-object traversal. Rather than adjusting a process-global
//! limit, serialization runs on a dedicated scoped thread with an enlarged
//! stack; the thread is joined on every exit path (success, error, panic),
//! so nothing leaks past the call.

use crate::error::{Error, Result};

/// Stack size for the serialization thread. The default thread stack is
/// enough for ordinary documents; this covers pathological nesting depth.
const SERIALIZE_STACK_BYTES: usize = 16 * 1024 * 1024;

/// Run `f` on a scoped worker thread with an enlarged stack.
///
/// Panics inside `f` resume on the caller's thread.
pub(crate) fn with_enlarged_stack<T, F>(f: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("pdf-serialize".into())
            .stack_size(SERIALIZE_STACK_BYTES)
            .spawn_scoped(scope, f)
            .map_err(Error::Io)?;
        match handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_the_closure_result() {
        let value = with_enlarged_stack(|| Ok(21 * 2)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn propagates_errors() {
        let result: Result<()> = with_enlarged_stack(|| {
            Err(Error::Serialization {
                reason: "boom".into(),
            })
        });
        assert!(matches!(result, Err(Error::Serialization { .. })));
    }

    #[test]
    fn survives_deep_recursion() {
        // Deliberately deeper than a default 2 MiB stack allows.
        fn descend(n: u64) -> u64 {
            if n == 0 {
                0
            } else {
                std::hint::black_box(descend(n - 1) + 1)
            }
        }
        let depth = with_enlarged_stack(|| Ok(descend(60_000))).unwrap();
        assert_eq!(depth, 60_000);
    }

    #[test]
    #[should_panic(expected = "guard panic")]
    fn resumes_panics_on_the_caller() {
        let _: Result<()> = with_enlarged_stack(|| panic!("guard panic"));
    }
}

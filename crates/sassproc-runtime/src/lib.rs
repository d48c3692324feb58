/*
 * sassproc-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Runtime abstraction layer for sassproc system operations.
 *
 * This crate provides a trait-based abstraction for the system operations
 * the asset pipeline needs (file access, timestamps, subprocesses), plus
 * the bridge that lets the grass compiler read stylesheets through it:
 *
 * - NativeRuntime: Full system access using std
 * - RuntimeFs: `grass::Fs` adapter that records every file the compiler loads
 */

mod native;
pub mod sass_native;
mod traits;

use std::sync::Arc;

// Re-export core types (API surface)
pub use traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime};

// Re-export runtime implementations
pub use native::NativeRuntime;

pub use sass_native::{RuntimeFs, SassOutput, SourcePreprocessor, compile_file};

/// A runtime shared between every component of a processor context.
pub type SharedRuntime = Arc<dyn SystemRuntime>;

/// Create a default runtime for the current platform.
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}

/// Create a default runtime wrapped for sharing.
pub fn shared_default_runtime() -> SharedRuntime {
    Arc::new(default_runtime())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runtime_exists() {
        let rt = default_runtime();
        let cwd = rt.cwd().unwrap();
        assert!(cwd.is_absolute());
    }

    #[test]
    fn test_native_runtime_file_operations() {
        let rt = NativeRuntime::new();
        let temp = tempfile::tempdir().unwrap();

        let file_path = temp.path().join("test.txt");
        rt.file_write(&file_path, b"hello").unwrap();

        assert!(rt.path_exists(&file_path, None).unwrap());
        assert_eq!(rt.file_read(&file_path).unwrap(), b"hello");
    }

    #[test]
    fn test_shared_runtime_is_usable_through_arc() {
        let rt = shared_default_runtime();
        let temp = tempfile::tempdir().unwrap();
        assert!(rt.is_dir(temp.path()).unwrap());
    }
}

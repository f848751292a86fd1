#![warn(
    clippy::pedantic,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

//! `cortado` decodes JVM class files without copying them.
//!
//! The decoder reads the constant pool into a table of `(kind, raw bytes)` slots and keeps
//! every variable-length nested structure (attributes, annotation element values,
//! type annotation targets and stack map frames) as a tag plus a slice of the original buffer.
//! The concrete shape of such a value is decoded only when it is asked for.
//!
//! ```
//! use cortado::ClassFile;
//!
//! # let bytes = vec![
//! #     0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
//! #     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//! # ];
//! let class = ClassFile::read(bytes)?;
//! assert_eq!(class.version().major(), 52);
//! assert!(class.methods().is_empty());
//! # Ok::<(), cortado::DecodeError>(())
//! ```
//! ## Features
#![doc = document_features::document_features!()]

pub mod access_flags;
pub mod annotation;
pub mod attribute;
pub mod class_file;
pub mod constant_pool;
pub mod encoding;
pub mod errors;
pub mod handle;
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub mod incremental;
pub(crate) mod intrinsics;
pub mod reader;
pub mod stack_map;

pub use class_file::{ClassFile, ReadOptions, Version};
pub use errors::{CastError, ConstantError, DecodeError, EncodeError, Incomplete};

/// Test utilities
#[cfg(test)]
pub(crate) mod tests;

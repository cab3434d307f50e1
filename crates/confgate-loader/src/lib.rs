//! # confgate-loader: Document Loader
//!
//! Turns named byte streams into [`StructuredDocument`]s.
//!
//! - **Decoders** ([`decoder`]): one [`Decoder`] per [`DocumentFormat`]. Each
//!   decodes bytes into zero or more [`Value`]s. YAML streams may hold many
//!   documents; whitespace-only input holds none.
//!
//! - **Loader** ([`loader`]): the [`DocumentLoader`] registry resolves the
//!   declared format (explicit override first, then the name's suffix),
//!   dispatches to the registered decoder, and assigns document identity.
//!
//! - **Sources** ([`source`]): [`InputSource`] bundles a name, an optional
//!   format override and the raw bytes. [`collect_paths`] expands directory
//!   arguments into a sorted, deduplicated file list.
//!
//! [`StructuredDocument`]: confgate_core::StructuredDocument
//! [`DocumentFormat`]: confgate_core::DocumentFormat
//! [`Value`]: confgate_core::Value

pub mod decoder;
pub mod loader;
pub mod source;

pub use decoder::{Decoder, JsonDecoder, JsonlDecoder, TomlDecoder, YamlDecoder};
pub use loader::DocumentLoader;
pub use source::{collect_paths, InputSource, STDIN_NAME};

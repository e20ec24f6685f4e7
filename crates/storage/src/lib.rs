//! Artifact handling for fracture
//!
//! This crate touches the files an engine leaves on disk, always while the
//! engine is closed:
//! - Locator: finds the first artifact of a class under a storage directory
//! - Injector: applies a corruption spec in place and reports the exact offset
//! - Format: read-only introspection of the LevelDB-family log and table layouts
//! - Resolve: structural offset resolution and offset region classification
//! - Drift: checks that a documented magic offset still lands where it used to

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod drift;
pub mod format;
pub mod injector;
pub mod locator;
pub mod resolve;

pub use drift::{check_empirical_offset, EmpiricalOffset, OffsetDrift};
pub use format::{BlockHandle, LayoutError, TableLayout, WalLayout};
pub use injector::corrupt;
pub use locator::{locate, locate_all, ArtifactLocator};
pub use resolve::{classify_offset, resolve_structural, Region, RegionKind};

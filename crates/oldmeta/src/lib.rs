//! Reuse of previously generated repository metadata.
//!
//! Regenerating a repository from scratch parses every package file again,
//! even though most packages have not changed since the last run. This
//! crate loads the previous run's primary, filelists and other documents
//! into an [`OldMetadataCache`] of raw per-package XML fragments, keyed by
//! package basename, so unchanged packages can be re-emitted verbatim.
//!
//! The three documents are read in lockstep by streaming pull-parsers: the
//! writer that produced them lists packages in the same order in all
//! three, and the extractor leans on that rather than re-verifying it.
//! Loading is deliberately forgiving. Individual records that cannot be
//! reused are skipped and reported as [`LoadWarning`]s; only structural
//! problems with a whole document abort the load.
//!
//! ```no_run
//! use remeta_oldmeta::locate_and_load;
//!
//! # fn main() -> remeta_oldmeta::error::Result<()> {
//! let loaded = locate_and_load("/srv/repo")?;
//! if let Some(record) = loaded.cache.get("bash-5.2-1.x86_64.rpm") {
//!     println!("reusable fragment: {}", record.primary_xml);
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod error;
mod extract;
mod models;
mod stream;

pub use cache::{LoadWarning, Loaded, OldMetadataCache};
pub use extract::{load_xml_metadata, locate_and_load};
pub use models::{DocKind, PackageRecord};

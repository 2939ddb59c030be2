//! CDN client and metadata fetch planner for NGDP/CASC
//!
//! This crate resolves a product's version/CDN catalogs, selects a CDN host,
//! and walks the metadata graph a build depends on — configs, archive
//! indices, archive bodies, loose content objects, patch files — fetching
//! whatever is locally missing into a [`keg_storage::Store`]. It also
//! implements the install operation: materializing a build's selected files
//! onto the local filesystem from the store.
//!
//! # Example
//!
//! ```no_run
//! use keg_cdn::{CdnTransport, FetchOptions, FetchPlanner};
//! use keg_cdn::catalog::{fetch_catalogs, select_cdn, resolve_version, VersionSelector};
//! use keg_storage::Store;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = CdnTransport::new()?;
//! let catalogs = fetch_catalogs(&transport, "http://us.patch.battle.net:1119/wow").await?;
//! let cdn = select_cdn(&catalogs.cdns, None, &[])?;
//! let builds = resolve_version(&catalogs.versions, VersionSelector::Name("wow"))?;
//!
//! let store = Store::open("/tmp/keg-store").await?;
//! let planner = FetchPlanner::new(&transport, &store, &cdn);
//! let plan = planner.run(&builds, &FetchOptions::default()).await?;
//! println!("{} archives fetched", plan.archives_fetched);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod error;
pub mod group;
pub mod install;
pub mod objects;
pub mod planner;
pub mod transport;

pub use catalog::{
    Catalogs, CdnEntry, ResolvedCdn, ResponseRecord, ResponseSource, VersionSelector,
    VersionsEntry, fetch_catalogs, resolve_version, select_cdn,
};
pub use error::{CdnError, CdnResult, ErrorKind};
pub use group::{ResolvedGroup, resolve_archive_group};
pub use install::{InstallOutcome, InstallReport, install};
pub use objects::{ObjectCategory, fetch_object};
pub use planner::{FetchOptions, FetchPlan, FetchPlanner, ResolvedBuild, SkippedObject};
pub use transport::CdnTransport;

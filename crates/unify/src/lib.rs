//! Project name unification
//!
//! This crate holds the single copy of the name-unification engine used by the
//! triage pipeline. It turns the free-text project mentions extracted from a
//! batch of emails into one canonical display label per entity:
//!
//! - [`normalize`]: accent/case/punctuation folding into comparison keys
//! - [`canonical`]: generic head/tail token stripping and acronym detection
//! - [`similarity`]: Ratcliff/Obershelp ratio plus containment and acronym rules
//! - [`cluster`]: frequency-first greedy clustering and representative choice
//!
//! # Example
//!
//! ```
//! use unify::build_canonical_map;
//!
//! let observed = vec![
//!     "Proyecto Alpha", "Proyecto Alpha", "Proyecto Alpha",
//!     "ALPHA", "ALPHA",
//!     "proyecto alpha",
//!     "Alpha Implementation",
//! ];
//! let map = build_canonical_map(&observed);
//!
//! assert_eq!(map["ALPHA"], "Alpha");
//! assert_eq!(map["Alpha Implementation"], "Alpha");
//! ```
//!
//! Every function here is total: garbage in, degraded output out. Nothing
//! returns an error and nothing panics on user input.

pub mod canonical;
pub mod cluster;
pub mod normalize;
pub mod similarity;

pub use canonical::{is_abbreviation, norm_key, NameForm};
pub use cluster::{
    apply_canonical, build_canonical_map, count_observations, is_null_like, unify_in_place,
    CanonicalMap, NameObservation, ProjectCluster, NULL_LABEL,
};
pub use normalize::{display_form, normalize_key};
pub use similarity::{are_similar, ratio};

// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Hit: hit-sample records, a recycling pool, and candidate ordering.
//!
//! ## Overview
//!
//! Every tick, each spatial probe runs a UI hit-test pass and (when needed) a
//! bounded 3D hit-test pass, merges the candidates, and picks the nearest one
//! that passes the host's filter gate. This crate holds the pieces of that
//! pipeline that are independent of any particular probe:
//!
//! - [`HitRecord`] / [`HitPool`]: recycled hit-sample storage, so resolving
//!   a hit allocates nothing in steady state.
//! - [`Candidate`] / [`sort_candidates`] / [`select_qualifying`]: the merged
//!   candidate ordering and the filter-gated selection walk.
//! - [`UiHitTest`] / [`SceneHitTest`] / [`SceneGraph`]: the narrow traits a
//!   host implements to supply UI candidates, 3D candidates, and scene
//!   parentage. The core holds no tree of its own.
//!
//! ## Ordering
//!
//! Merged candidates sort ascending by distance. Two UI candidates at equal
//! distance order by *descending* render depth, then ascending raycast
//! index. A UI and a 3D candidate at exactly equal distance have no inherent
//! order; the sort is stable, so merge order decides. See
//! [`compare_candidates`].
//!
//! ## Features
//!
//! - `std` (default): enables `std` support for dependencies.
//! - `libm`: enables `no_std` builds that rely on `libm` for floating-point
//!   math.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod candidate;
mod provider;
mod record;

pub use candidate::{
    CANDIDATE_INLINE, Candidate, CandidateBuf, CandidateKind, compare_candidates,
    select_qualifying, sort_candidates,
};
pub use provider::{PreHit, SceneGraph, SceneHitTest, UiHitTest};
pub use record::{HitHandle, HitPool, HitRecord, UiHitData};

//! Tether Core
//!
//! Shared vocabulary for submitting and following jobs on a remote
//! cluster control plane.
//!
//! This crate contains:
//! - Domain types: job handles, statuses and the outcomes of submit and follow
//! - DTOs: wire bodies of the job-submission API

pub mod domain;
pub mod dto;

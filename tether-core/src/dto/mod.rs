//! Data Transfer Objects for the job-submission API

pub mod job;

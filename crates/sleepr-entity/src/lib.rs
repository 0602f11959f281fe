//! # sleepr-entity
//!
//! Document models for Sleepr. Every struct in this crate represents a
//! stored document or its creation payload. Documents implement
//! [`sleepr_core::traits::Document`] and serialize their identifier as
//! `_id`.

pub mod reservation;

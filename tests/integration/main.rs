//! Integration tests for the Sleepr repositories.

mod bootstrap_test;
mod concurrency_test;
mod helpers;
mod reservation_test;

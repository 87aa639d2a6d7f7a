//! Booking automation engine.
//!
//! Drives a reservation site through search, train selection, class
//! configuration, sign-in and passenger entry, then parks at the payment
//! page for a human. Runs that need a decision or a manual step suspend
//! and wait to be resumed.

pub mod candidate;
pub mod config;
pub mod domain;
pub mod engine;
pub mod page;
pub mod recovery;
pub mod schedule;
pub mod selector;
pub mod timing;
pub mod web;

//! Test suite for DocCollab
//!
//! This module organizes all tests

pub mod common;

//! Integration tests for the MySQL driver against a real server
//!
//! A MySQL container is started on first use and shared by every test. It
//! gets the same accounts a Tiny-SQL server ships with (`root` with no
//! password, `test`/`test`, `admin`/`admin123`), all using
//! `mysql_native_password`.
//!
//! # Usage
//!
//! ```bash
//! # Docker is required, so the tests are ignored by default
//! cargo test -p tinyprobe-driver-tests -- --ignored
//!
//! # Run against an already running server instead, e.g. Tiny-SQL itself
//! TINYPROBE_TEST_SERVER=127.0.0.1:3307 cargo test -p tinyprobe-driver-tests -- --ignored
//! ```

#![warn(missing_docs)]

pub mod fixtures;
pub mod test_containers;

#[cfg(test)]
mod connection_tests;

#[cfg(test)]
mod parameter_tests;

#[cfg(test)]
mod pool_tests;

#[cfg(test)]
mod session_tests;

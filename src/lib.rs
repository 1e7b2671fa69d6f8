//! Library half of `crimson-loadtest`: everything the CLI drives.

pub mod loadtest;

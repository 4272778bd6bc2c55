//! Test suites for the murmur daemon.

mod process_behaviour;
mod support;

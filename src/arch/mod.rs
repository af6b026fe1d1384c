//! # Architecture Abstraction Layer
//!
//! Cycle-counter sources and target glue. The Cortex-M4 port reads the
//! DWT cycle counter; the simulated clock serves host runs and tests.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
pub mod sim;

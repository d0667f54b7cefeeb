//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below exercises one path of the board logic against mock pins. All tests
//! run on the host.

mod control_tests;
mod mock_hw;
mod protocol_tests;

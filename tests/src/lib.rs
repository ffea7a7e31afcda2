//! Integration test suite for `nodecfg`; see `tests/`.

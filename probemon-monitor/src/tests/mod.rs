//! Pipeline tests and end-to-end scenarios for the monitor runtime.

mod support;

//! End-to-end scenarios over the public API

mod scenarios;

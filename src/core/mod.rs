// Core modules implementing capture parsing, comparison, orchestration, and error modeling.
pub mod capture;
pub mod compare;
pub mod diff;
pub mod error;

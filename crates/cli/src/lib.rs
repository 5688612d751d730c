//! `fieldline` command-line front end.
//!
//! Signs in against the field-service API, keeps the session in a credentials
//! file between invocations, sends authenticated requests, and answers
//! permission questions against the default role table.

pub mod cli;

#![allow(dead_code)]

pub use autorunner_test_utils::{
    host_event_matching, init_tracing, transcript, with_timeout, with_timeout_of,
    ProjectDirBuilder, Transcript,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

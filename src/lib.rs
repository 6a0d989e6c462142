// src/lib.rs
// Test support for the Deis controller SDK

pub mod body;
pub mod client;
pub mod error;
pub mod harness;
pub mod headers;
pub mod logging;
pub mod progress;
pub mod server;
pub mod settings;
pub mod version;

pub use body::{AssertionFailure, assert_body, check_body};
pub use client::Client;
pub use error::{Error, Result};
pub use harness::{TestHarness, new_test_server_and_client};
pub use headers::{set_headers, with_headers};
pub use progress::strip_progress;
pub use server::{Mux, TestServer};
pub use settings::Settings;
pub use version::API_VERSION;

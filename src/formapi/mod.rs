pub mod client;
pub mod types;

pub use client::{FormApiClient, FormApiError};
pub use types::{RemoteAnswer, RemoteForm, RemoteSubmission};

pub mod client_key;

pub use client_key::{resolve_client_key, ClientKey, ClientKeyExtractor, FALLBACK_CLIENT_KEY};

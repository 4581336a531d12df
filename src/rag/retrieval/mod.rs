// Remote retrieval against the vector-match store
pub mod remote;

pub use remote::{decode_matches, MatchStore, RemoteMatchClient};

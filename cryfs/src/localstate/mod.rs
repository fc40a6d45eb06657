//! Per-host local state, used to detect filesystem substitution and to
//! keep a stable per-filesystem client id.

mod basedir_metadata;
mod local_state_dir;
mod my_client_id;

pub use basedir_metadata::BasedirMetadata;
pub use local_state_dir::LocalStateDir;
pub use my_client_id::MyClientId;

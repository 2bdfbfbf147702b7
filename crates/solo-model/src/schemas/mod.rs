//! Versioned schemas of the persisted documents

mod local;
mod remote;

pub use local::{local_config_schema, LocalConfigV1Migration, LocalConfigV2Migration, LOCAL_CONFIG_SCHEMA_NAME};
pub use remote::{
    remote_config_schema, RemoteConfigV1Migration, RemoteConfigV2Migration, REMOTE_CONFIG_SCHEMA_NAME,
};

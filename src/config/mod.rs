pub mod proc_initiator;
pub mod proc_loader;
pub mod proc_validator;
pub mod settings;
pub mod types;

pub use settings::{LogFormat, LoggingConfig};
pub use types::{
    DeploymentMode, KeycloakConfig, OntoConfig, ServiceConfig, SessionStateConfig, StorageConfig,
};

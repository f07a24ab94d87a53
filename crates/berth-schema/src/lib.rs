//! Data model for the Berth container lifecycle control plane.
//!
//! This crate defines the schema layer: container identity (`ContainerKey`),
//! the closed vocabularies of container types, actions, states and deployment
//! modes, the durable `ContainerStatus` record with its two-phase `Transit`
//! marker, backend `StatusReport`s, runnable `ContainerSpec`s, the TOML
//! `Definitions` file for projects and dev services, and `BerthConfig`.

pub mod command;
pub mod config;
pub mod definitions;
pub mod spec;
pub mod status;
pub mod types;

pub use command::CommandRequest;
pub use config::{
    BerthConfig, ClusterSection, ConfigError, EngineSection, ModeSetting, StoreKind, StoreSection,
    CONFIG_ENV,
};
pub use definitions::{parse_definitions_file, parse_definitions_str, Definitions, DefinitionsError};
pub use spec::{ContainerSpec, PortMapping};
pub use status::{ContainerStatus, StatusReport, Transit};
pub use types::{Action, ContainerKey, ContainerState, ContainerType, DeploymentMode, SchemaError};

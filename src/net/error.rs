use super::{SwitchLevel, VmId};
use crate::runtime::RuntimeError;
use std::{error::Error, fmt::Display, io};

///
/// An error while describing, loading or installing a network.
///
#[derive(Debug)]
pub enum NetworkError {
    /// The configuration file could not be read.
    Io(io::Error),
    /// The configuration is not valid YAML or misses required fields.
    Yaml(serde_yml::Error),
    /// A switch or host name is used twice.
    DuplicateName(String),
    /// A referenced switch does not exist.
    UnknownSwitch(String),
    /// A referenced host does not exist.
    UnknownHost(String),
    /// A referenced VM is not placed on any host.
    UnknownVm(VmId),
    /// A VM was placed on two hosts.
    DuplicateVm(VmId),
    /// Two switches cannot be linked, since the child is not exactly one
    /// level below the parent.
    LevelMismatch {
        /// The upper switch.
        parent: String,
        /// The level of the upper switch.
        parent_level: SwitchLevel,
        /// The lower switch.
        child: String,
        /// The level of the lower switch.
        child_level: SwitchLevel,
    },
    /// A host was attached to a switch that is not an edge switch.
    NotAnEdge(String),
    /// A numeric parameter is out of range.
    InvalidValue {
        /// The parameter.
        field: String,
        /// The rejected value.
        value: f64,
    },
    /// The network entities could not be registered.
    Runtime(RuntimeError),
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read network configuration: {e}"),
            Self::Yaml(e) => write!(f, "malformed network configuration: {e}"),
            Self::DuplicateName(name) => write!(f, "the name '{name}' is used twice"),
            Self::UnknownSwitch(name) => write!(f, "unknown switch '{name}'"),
            Self::UnknownHost(name) => write!(f, "unknown host '{name}'"),
            Self::UnknownVm(vm) => write!(f, "{vm} is not placed on any host"),
            Self::DuplicateVm(vm) => write!(f, "{vm} is placed on more than one host"),
            Self::LevelMismatch {
                parent,
                parent_level,
                child,
                child_level,
            } => write!(
                f,
                "cannot link {child_level} switch '{child}' below {parent_level} switch '{parent}'"
            ),
            Self::NotAnEdge(name) => {
                write!(f, "hosts can only be attached to edge switches, '{name}' is none")
            }
            Self::InvalidValue { field, value } => {
                write!(f, "invalid value {value} for '{field}'")
            }
            Self::Runtime(e) => write!(f, "failed to install network: {e}"),
        }
    }
}

impl Error for NetworkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Yaml(e) => Some(e),
            Self::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NetworkError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_yml::Error> for NetworkError {
    fn from(value: serde_yml::Error) -> Self {
        Self::Yaml(value)
    }
}

impl From<RuntimeError> for NetworkError {
    fn from(value: RuntimeError) -> Self {
        Self::Runtime(value)
    }
}

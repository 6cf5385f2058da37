//! Install plans.

use std::fmt;
use std::path::PathBuf;

use crate::core::descriptor::ProjectDescriptor;

/// Where the built package ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstallTarget {
    /// Install files straight onto the host under the configured prefix
    #[default]
    DirectHostInstall,
    /// Generate a spec, build an RPM and install that
    NativePackageBuild,
}

impl fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallTarget::DirectHostInstall => write!(f, "direct host install"),
            InstallTarget::NativePackageBuild => write!(f, "native package build"),
        }
    }
}

/// Everything the build dispatcher needs for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub target: InstallTarget,
    pub descriptor: ProjectDescriptor,
    pub source_dir: PathBuf,
}

impl InstallPlan {
    pub fn new(target: InstallTarget, descriptor: ProjectDescriptor, source_dir: PathBuf) -> Self {
        InstallPlan {
            target,
            descriptor,
            source_dir,
        }
    }
}

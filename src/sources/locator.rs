//! Source locator - turns a request into a fetchable origin.

use crate::core::artifact::{DistributionKind, SourceOrigin};
use crate::core::error::InstallError;
use crate::core::request::{project_name_from_url, PackageRequest};
use crate::sources::registry::{select_artifact, RegistryClient};

/// Resolves package requests to source origins.
pub struct SourceLocator {
    registry: RegistryClient,
}

impl SourceLocator {
    pub fn new(registry: RegistryClient) -> Self {
        SourceLocator { registry }
    }

    /// Locate the source for a request.
    ///
    /// Registry requests cost one metadata query. Version-control requests
    /// are passed through; their reference is resolved during the clone.
    pub fn locate(&self, request: &PackageRequest) -> Result<SourceOrigin, InstallError> {
        match request {
            PackageRequest::Registry { name, version } => {
                let metadata = self.registry.fetch_metadata(name, version.as_deref())?;

                let file = select_artifact(&metadata.urls).ok_or_else(|| {
                    tracing::error!("No suitable distribution found for {}", name);
                    InstallError::NotFound {
                        package: name.clone(),
                        version: version.clone(),
                    }
                })?;

                let kind = DistributionKind::from_packagetype(&file.packagetype);
                if let DistributionKind::Binary(ref packagetype) = kind {
                    tracing::warn!(
                        "No source distribution for {}; falling back to {} {}",
                        name,
                        packagetype,
                        file.filename
                    );
                }

                Ok(SourceOrigin::Registry {
                    name: name.clone(),
                    version: version.clone().or(metadata.info.version),
                    url: file.url.clone(),
                    filename: file.filename.clone(),
                    kind,
                    sha256: file.digests.sha256.clone(),
                })
            }
            PackageRequest::VersionControl { url, reference } => {
                Ok(SourceOrigin::VersionControl {
                    url: url.clone(),
                    project_name: project_name_from_url(url),
                    reference: reference.clone(),
                })
            }
        }
    }
}

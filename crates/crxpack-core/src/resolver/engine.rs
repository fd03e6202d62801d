//! Backward propagation, validation, and forward resolution.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crxpack_schema::{
    CrxVersion, V3_MINIMUM_PLATFORM_VERSION, derive_identifier, encode, signer_from_der,
};

use super::field::{Field, FieldState};
use super::graph::Output;
use super::request::{BuildRequest, ContentsSource};
use crate::archive::{pack_directory, read_manifest};
use crate::error::{ConfigError, PackError};
use crate::keys::{generate_rsa, public_from_private, valid_rsa_bits};
use crate::reporter::{NullReporter, Reporter};
use crate::update::render_update_document;

/// A planned build, resolved one output at a time.
///
/// Planning promotes every prerequisite of a requested output and checks
/// that all of them can be satisfied; no work happens until [`step`] or
/// [`run`] is called. Between steps [`request`] shows whatever has been
/// resolved so far.
///
/// [`step`]: Resolution::step
/// [`run`]: Resolution::run
/// [`request`]: Resolution::request
pub struct Resolution {
    request: BuildRequest,
    pending: VecDeque<Output>,
    requested_by: HashMap<Output, Output>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolution")
            .field("request", &self.request)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Resolution {
    /// Propagate requests through the graph and validate the result.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, checking the most downstream
    /// outputs first.
    pub fn plan(mut request: BuildRequest) -> Result<Self, ConfigError> {
        let requested_by = propagate(&mut request);
        validate(&request, &requested_by)?;

        let pending: VecDeque<Output> = Output::ALL
            .into_iter()
            .filter(|output| request.state(*output) == FieldState::Requested)
            .collect();
        tracing::debug!(?pending, "planned resolution");

        Ok(Self {
            request,
            pending,
            requested_by,
            reporter: Arc::new(NullReporter),
        })
    }

    /// Send progress notifications to `reporter`.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The request as resolved so far.
    pub fn request(&self) -> &BuildRequest {
        &self.request
    }

    /// Outputs still to be resolved, in resolution order.
    pub fn pending(&self) -> impl Iterator<Item = Output> + '_ {
        self.pending.iter().copied()
    }

    /// The output whose request caused `output` to be requested, if it was
    /// not requested by the caller.
    pub fn requested_by(&self, output: Output) -> Option<Output> {
        self.requested_by.get(&output).copied()
    }

    /// Resolve the next pending output.
    ///
    /// Returns `None` once nothing is left. Outputs already filled in as a
    /// byproduct of an earlier step are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first failure from a collaborator or the codec.
    pub async fn step(&mut self) -> Result<Option<Output>, PackError> {
        while let Some(output) = self.pending.pop_front() {
            if self.request.state(output) != FieldState::Requested {
                tracing::trace!(%output, "already resolved as a byproduct");
                continue;
            }
            self.reporter.resolving(output);
            let detail = self.compute(output).await?;
            tracing::debug!(%output, %detail, "resolved");
            self.reporter.resolved(output, &detail);
            return Ok(Some(output));
        }
        Ok(None)
    }

    /// Resolve every pending output and return the completed request.
    ///
    /// # Errors
    ///
    /// Returns the first failure; remaining outputs are not attempted.
    pub async fn run(mut self) -> Result<BuildRequest, PackError> {
        while self.step().await?.is_some() {}
        Ok(self.request)
    }

    async fn compute(&mut self, output: Output) -> Result<String, PackError> {
        let req = &mut self.request;
        match output {
            Output::PrivateKey => {
                let bits = req.key_size;
                let pair = tokio::task::spawn_blocking(move || generate_rsa(bits)).await??;
                req.private_key.set(pair.private_key);
                req.public_key.fill(pair.public_key);
                Ok(format!("generated {bits}-bit RSA key"))
            }
            Output::PublicKey => {
                let private_key = require(req.private_key.value(), output, Output::PrivateKey)?;
                let public_key = public_from_private(private_key)?;
                let len = public_key.len();
                req.public_key.set(public_key);
                Ok(format!("{len} bytes"))
            }
            Output::Archive => {
                let origin = self.requested_by.get(&output).copied().unwrap_or(output);
                match req.contents.as_ref() {
                    Some(ContentsSource::Directory(root)) => {
                        let packed = pack_directory(root).await?;
                        let count = packed.files.len();
                        req.archive.set(packed.archive);
                        req.manifest.fill(packed.manifest);
                        Ok(format!("{count} files from {}", root.display()))
                    }
                    Some(ContentsSource::Archive(bytes)) => {
                        let len = bytes.len();
                        req.archive.set(bytes.clone());
                        Ok(format!("{len} bytes"))
                    }
                    None => Err(ConfigError::ContentsRequired {
                        required_by: origin,
                    }
                    .into()),
                }
            }
            Output::Manifest => {
                let archive = require(req.archive.value(), output, Output::Archive)?;
                let manifest = read_manifest(archive)?;
                req.manifest.set(manifest);
                Ok(format!("read from {}", crate::archive::MANIFEST_FILE))
            }
            Output::Identifier => {
                let public_key = require(req.public_key.value(), output, Output::PublicKey)?;
                let id = derive_identifier(public_key);
                let detail = id.to_string();
                req.identifier.set(id);
                Ok(detail)
            }
            Output::PackageVersion => {
                let manifest = req.manifest.value().ok_or(ConfigError::ManifestRequired {
                    required_by: Output::PackageVersion,
                })?;
                let version = manifest
                    .package_version()
                    .ok_or(ConfigError::MissingVersion)?
                    .to_string();
                req.package_version.set(version.clone());
                Ok(version)
            }
            Output::MinimumPlatformVersion => {
                let declared = req
                    .manifest
                    .value()
                    .and_then(|m| m.minimum_platform_version())
                    .map(str::to_string);
                let resolved = match (declared, req.crx_version()?) {
                    (Some(version), _) => Some(version),
                    (None, CrxVersion::V3) => Some(V3_MINIMUM_PLATFORM_VERSION.to_string()),
                    (None, CrxVersion::V2) => None,
                };
                if let Some(version) = resolved {
                    req.minimum_platform_version.set(version.clone());
                    Ok(version)
                } else {
                    req.minimum_platform_version = Field::Unset;
                    Ok("none for v2 containers".to_string())
                }
            }
            Output::Container => {
                let version = req.crx_version()?;
                let private_key = require(req.private_key.value(), output, Output::PrivateKey)?;
                let archive = require(req.archive.value(), output, Output::Archive)?;
                let signer = signer_from_der(private_key)?;
                if req
                    .public_key
                    .value()
                    .is_some_and(|given| given.as_slice() != signer.public_key())
                {
                    return Err(ConfigError::KeyMismatch.into());
                }
                let container = encode(version, signer.as_ref(), archive)?;
                let detail = format!("{version}, {} bytes", container.len());
                req.container.set(container);
                Ok(detail)
            }
            Output::UpdateDocument => {
                let codebase = req.codebase.as_deref().ok_or(ConfigError::UrlRequired)?;
                let id = require(req.identifier.value(), output, Output::Identifier)?;
                let version = require(req.package_version.value(), output, Output::PackageVersion)?;
                let document = render_update_document(
                    id.as_str(),
                    codebase,
                    version,
                    req.minimum_platform_version.value().map(String::as_str),
                );
                req.update_document.set(document);
                Ok(format!("for {codebase}"))
            }
        }
    }
}

/// Plan and run `request` to completion without progress reporting.
///
/// # Errors
///
/// See [`Resolution::plan`] and [`Resolution::run`].
pub async fn resolve(request: BuildRequest) -> Result<BuildRequest, PackError> {
    Resolution::plan(request)?.run().await
}

fn require<T>(value: Option<&T>, output: Output, prerequisite: Output) -> Result<&T, ConfigError> {
    value.ok_or(ConfigError::MissingPrerequisite {
        output,
        prerequisite,
    })
}

/// Promote the unset prerequisites of every requested output, downstream
/// first so promotions cascade to the roots in one pass.
fn propagate(request: &mut BuildRequest) -> HashMap<Output, Output> {
    let mut requested_by = HashMap::new();
    for output in Output::downstream_first() {
        if request.state(output) != FieldState::Requested {
            continue;
        }
        for edge in output.prerequisites() {
            if edge.soft && !request.has_manifest_source() {
                continue;
            }
            if request.request(edge.target) {
                tracing::trace!(%output, prerequisite = %edge.target, "promoted prerequisite");
                requested_by.insert(edge.target, output);
            }
        }
    }
    requested_by
}

/// Check every requested output's external preconditions before any work.
fn validate(
    request: &BuildRequest,
    requested_by: &HashMap<Output, Output>,
) -> Result<(), ConfigError> {
    let origin = |output: Output| requested_by.get(&output).copied().unwrap_or(output);

    for output in Output::downstream_first() {
        if request.state(output) != FieldState::Requested {
            continue;
        }
        match output {
            Output::UpdateDocument => {
                if request.codebase.is_none() {
                    return Err(ConfigError::UrlRequired);
                }
            }
            Output::Container => {
                request.crx_version()?;
                if !request.has_archive_source() {
                    return Err(ConfigError::ContentsRequired {
                        required_by: Output::Container,
                    });
                }
            }
            Output::MinimumPlatformVersion => {
                request.crx_version()?;
            }
            Output::PackageVersion => {
                if !request.has_manifest_source() {
                    return Err(ConfigError::ManifestRequired {
                        required_by: Output::PackageVersion,
                    });
                }
            }
            Output::Manifest => {
                if !request.has_manifest_source() {
                    return Err(ConfigError::ManifestRequired {
                        required_by: origin(output),
                    });
                }
            }
            Output::Archive => {
                if request.contents.is_none() {
                    return Err(ConfigError::ContentsRequired {
                        required_by: origin(output),
                    });
                }
            }
            Output::PrivateKey => {
                if request.public_key.is_given() {
                    return Err(ConfigError::PublicKeyWithoutPrivateKey);
                }
                if !valid_rsa_bits(request.key_size) {
                    return Err(ConfigError::InvalidKeySize(request.key_size));
                }
            }
            Output::PublicKey | Output::Identifier => {}
        }
    }
    Ok(())
}

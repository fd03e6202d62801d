//! The fixed dependency graph between build outputs.

use std::fmt;

/// A named build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Output {
    /// DER private key. A root: generated when requested.
    PrivateKey,
    /// DER public key.
    PublicKey,
    /// ZIP archive of the package contents.
    Archive,
    /// Parsed `manifest.json`.
    Manifest,
    /// 32-character package identifier.
    Identifier,
    /// Version string from the manifest.
    PackageVersion,
    /// Minimum platform version for the update document.
    MinimumPlatformVersion,
    /// Signed container bytes.
    Container,
    /// Update-status XML document.
    UpdateDocument,
}

impl Output {
    /// Every output, each listed after all of its prerequisites.
    pub const ALL: [Output; 9] = [
        Output::PrivateKey,
        Output::PublicKey,
        Output::Archive,
        Output::Manifest,
        Output::Identifier,
        Output::PackageVersion,
        Output::MinimumPlatformVersion,
        Output::Container,
        Output::UpdateDocument,
    ];

    /// Direct prerequisites of this output.
    pub fn prerequisites(self) -> &'static [Edge] {
        match self {
            Output::PrivateKey | Output::Archive => &[],
            Output::PublicKey => const { &[Edge::hard(Output::PrivateKey)] },
            Output::Manifest => const { &[Edge::hard(Output::Archive)] },
            Output::Identifier => const { &[Edge::hard(Output::PublicKey)] },
            Output::PackageVersion => const { &[Edge::hard(Output::Manifest)] },
            Output::MinimumPlatformVersion => const { &[Edge::soft(Output::Manifest)] },
            Output::Container => const {
                &[
                    Edge::hard(Output::Archive),
                    Edge::hard(Output::PrivateKey),
                    Edge::hard(Output::PublicKey),
                ]
            },
            Output::UpdateDocument => const {
                &[
                    Edge::hard(Output::Identifier),
                    Edge::hard(Output::PackageVersion),
                    Edge::hard(Output::MinimumPlatformVersion),
                ]
            },
        }
    }

    /// Outputs ordered from most downstream to the roots.
    pub fn downstream_first() -> impl Iterator<Item = Output> {
        Self::ALL.into_iter().rev()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Output::PrivateKey => "private key",
            Output::PublicKey => "public key",
            Output::Archive => "archive",
            Output::Manifest => "manifest",
            Output::Identifier => "identifier",
            Output::PackageVersion => "package version",
            Output::MinimumPlatformVersion => "minimum platform version",
            Output::Container => "container",
            Output::UpdateDocument => "update document",
        };
        f.write_str(name)
    }
}

/// A dependency on another output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// The prerequisite output.
    pub target: Output,
    /// Soft edges are followed only when the prerequisite has a source.
    pub soft: bool,
}

impl Edge {
    const fn hard(target: Output) -> Self {
        Self {
            target,
            soft: false,
        }
    }

    const fn soft(target: Output) -> Self {
        Self { target, soft: true }
    }
}

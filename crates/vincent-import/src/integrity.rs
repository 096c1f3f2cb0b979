//! SRI integrity verification for downloaded tarballs.
//!
//! Registry metadata carries `sha512-<base64>` / `sha256-<base64>`
//! integrity strings. SHA-1 tokens are skipped: the algorithm is broken
//! and the legacy `shasum` field exists only for very old packages.

use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{ImportError, ImportResult};

/// Supported SRI algorithms, ordered by strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SriAlgorithm {
    Sha256,
    Sha512,
}

/// Verify tarball bytes against an SRI integrity string.
///
/// Multiple space-separated hashes are allowed; the strongest supported
/// one is checked. The digest comparison is constant-time.
///
/// # Errors
///
/// Returns [`ImportError::IntegrityMismatch`] on digest mismatch and
/// [`ImportError::Registry`] when the SRI string is malformed or carries
/// no supported algorithm.
pub(crate) fn verify_integrity(data: &[u8], sri: &str, package: &str) -> ImportResult<()> {
    let (algorithm, expected_b64) = strongest_digest(sri)?;

    let expected = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, expected_b64)
        .map_err(|e| ImportError::Registry {
            message: format!("invalid base64 in SRI hash: {e}"),
        })?;

    let actual = match algorithm {
        SriAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        SriAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    };

    if !bool::from(actual.ct_eq(&expected)) {
        return Err(ImportError::IntegrityMismatch {
            package: package.to_string(),
            expected: sri.to_string(),
        });
    }

    Ok(())
}

/// Pick the strongest supported hash out of a (possibly multi-token)
/// SRI string.
fn strongest_digest(sri: &str) -> ImportResult<(SriAlgorithm, &str)> {
    let mut best: Option<(SriAlgorithm, &str)> = None;

    for token in sri.split_whitespace() {
        if let Some((algorithm, digest)) = parse_token(token) {
            let stronger = match &best {
                Some((best_algorithm, _)) => algorithm > *best_algorithm,
                None => true,
            };
            if stronger {
                best = Some((algorithm, digest));
            }
        }
    }

    best.ok_or_else(|| ImportError::Registry {
        message: format!("no supported hash in SRI string: {sri}"),
    })
}

/// Parse one `algorithm-digest` token. Unsupported algorithms (including
/// SHA-1) yield `None`.
fn parse_token(token: &str) -> Option<(SriAlgorithm, &str)> {
    // Trailing `?opt` parameters are allowed by the SRI spec.
    let token = token.split('?').next().unwrap_or(token);
    let (algorithm, digest) = token.split_once('-')?;
    match algorithm {
        "sha256" => Some((SriAlgorithm::Sha256, digest)),
        "sha512" => Some((SriAlgorithm::Sha512, digest)),
        _ => None,
    }
}

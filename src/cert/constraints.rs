//! Limits a CA places on the certificates it issues.
//!
//! An issuer with no groups, networks or unsafe networks is unrestricted in
//! that dimension. Once it lists at least one entry, every entry of the
//! candidate must be permitted by it.

use std::collections::BTreeSet;

use time::OffsetDateTime;

use super::Certificate;
use crate::error::ConstraintError;
use crate::network::Network;

/// Checks a candidate certificate against the issuing CA.
///
/// The candidate validity window must lie inside the issuer's, its groups must
/// be a subset of the issuer's groups, its networks and unsafe networks must
/// each be covered by one of the issuer's, and neither network list may hold
/// duplicates.
pub fn check_ca_constraints(
    signer: &Certificate,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    groups: &[String],
    networks: &[Network],
    unsafe_networks: &[Network],
) -> Result<(), ConstraintError> {
    if not_after > signer.not_after() {
        return Err(ConstraintError::ExpiresAfterSigner);
    }

    if not_before < signer.not_before() {
        return Err(ConstraintError::ValidBeforeSigner);
    }

    let signer_groups = signer.groups();
    if !signer_groups.is_empty() {
        if let Some(group) = groups.iter().find(|g| !signer_groups.contains(*g)) {
            return Err(ConstraintError::GroupNotPermitted(group.clone()));
        }
    }

    if let Some(network) = first_uncovered(signer.networks(), networks) {
        return Err(ConstraintError::NetworkNotPermitted(network));
    }

    if let Some(network) = first_uncovered(signer.unsafe_networks(), unsafe_networks) {
        return Err(ConstraintError::UnsafeNetworkNotPermitted(network));
    }

    if let Some(network) = first_duplicate(networks) {
        return Err(ConstraintError::DuplicateNetwork(network));
    }

    if let Some(network) = first_duplicate(unsafe_networks) {
        return Err(ConstraintError::DuplicateUnsafeNetwork(network));
    }

    Ok(())
}

fn first_uncovered(allowed: &[Network], requested: &[Network]) -> Option<Network> {
    if allowed.is_empty() {
        return None;
    }
    requested
        .iter()
        .find(|candidate| !allowed.iter().any(|a| a.covers(*candidate)))
        .copied()
}

fn first_duplicate(networks: &[Network]) -> Option<Network> {
    let mut seen = BTreeSet::new();
    networks.iter().find(|n| !seen.insert(**n)).copied()
}

//! Interface satisfaction, suggestion and the descriptor's declared
//! interface set.
//!
//! A descriptor satisfies a manifest when every required function and event
//! signature is among the signatures it exposes. Provisional functions have
//! no known signature and never count.

use chainbroker_core::{BrokerError, ContractDescriptor, InterfaceManifest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::InterfaceCatalog;

/// Function and event signatures a descriptor exposes.
pub fn exposed_signatures(descriptor: &ContractDescriptor) -> BTreeSet<String> {
    let mut exposed = descriptor.function_signatures();
    exposed.extend(descriptor.event_signatures());
    exposed
}

/// Required signatures the descriptor does not expose, sorted.
pub fn missing_signatures(
    descriptor: &ContractDescriptor,
    manifest: &InterfaceManifest,
) -> Vec<String> {
    let exposed = exposed_signatures(descriptor);
    manifest
        .functions
        .iter()
        .chain(&manifest.events)
        .filter(|sig| !exposed.contains(*sig))
        .cloned()
        .collect()
}

pub fn satisfies(descriptor: &ContractDescriptor, manifest: &InterfaceManifest) -> bool {
    missing_signatures(descriptor, manifest).is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceMatch {
    pub interface_id: String,
    pub name: String,
    pub matched_count: usize,
    /// Already listed in the descriptor's `implements`
    pub already_implemented: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSuggestions {
    /// Satisfied manifests, most signatures first, then by id
    pub ranked: Vec<InterfaceMatch>,
    /// Ids of the manifests sharing the highest count
    pub best: Vec<String>,
}

/// Ranks the catalog manifests the descriptor satisfies. Manifests that
/// require nothing match every contract and are never suggested.
pub fn suggest_interfaces(
    descriptor: &ContractDescriptor,
    catalog: &dyn InterfaceCatalog,
) -> InterfaceSuggestions {
    let exposed = exposed_signatures(descriptor);
    let mut ranked: Vec<InterfaceMatch> = catalog
        .list_interfaces()
        .into_iter()
        .filter(|m| m.required_count() > 0)
        .filter(|m| m.functions.iter().chain(&m.events).all(|s| exposed.contains(s)))
        .map(|m| InterfaceMatch {
            matched_count: m.required_count(),
            already_implemented: descriptor.implements.contains(&m.id),
            interface_id: m.id,
            name: m.name,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.matched_count
            .cmp(&a.matched_count)
            .then_with(|| a.interface_id.cmp(&b.interface_id))
    });

    let best = match ranked.first() {
        Some(top) => ranked
            .iter()
            .take_while(|m| m.matched_count == top.matched_count)
            .map(|m| m.interface_id.clone())
            .collect(),
        None => Vec::new(),
    };
    InterfaceSuggestions { ranked, best }
}

/// Looks up every id and checks it against the descriptor before anything
/// is changed.
fn checked_manifests(
    descriptor: &ContractDescriptor,
    ids: &[String],
    catalog: &dyn InterfaceCatalog,
) -> Result<Vec<InterfaceManifest>, BrokerError> {
    ids.iter()
        .map(|id| {
            let manifest = catalog.get_interface(id).ok_or_else(|| BrokerError::NotFound {
                kind: "interface",
                id: id.clone(),
            })?;
            let missing = missing_signatures(descriptor, &manifest);
            if !missing.is_empty() {
                return Err(BrokerError::IncompatibleInterface {
                    interface_id: id.clone(),
                    missing,
                });
            }
            Ok(manifest)
        })
        .collect()
}

fn owned_ids<S: AsRef<str>>(ids: impl IntoIterator<Item = S>) -> Vec<String> {
    ids.into_iter().map(|s| s.as_ref().to_string()).collect()
}

/// Adds the interfaces; fails without changes if any is not satisfied.
pub fn add_interfaces<S: AsRef<str>>(
    descriptor: &mut ContractDescriptor,
    ids: impl IntoIterator<Item = S>,
    catalog: &dyn InterfaceCatalog,
) -> Result<(), BrokerError> {
    let ids = owned_ids(ids);
    checked_manifests(descriptor, &ids, catalog)?;
    tracing::info!(contract = %descriptor.id, interfaces = ?ids, "interfaces added");
    descriptor.implements.extend(ids);
    Ok(())
}

/// Removes the interfaces; unknown ids are ignored.
pub fn remove_interfaces<S: AsRef<str>>(
    descriptor: &mut ContractDescriptor,
    ids: impl IntoIterator<Item = S>,
) {
    for id in ids {
        descriptor.implements.remove(id.as_ref());
    }
}

/// Replaces the declared set; every id must be satisfied.
pub fn set_interfaces<S: AsRef<str>>(
    descriptor: &mut ContractDescriptor,
    ids: impl IntoIterator<Item = S>,
    catalog: &dyn InterfaceCatalog,
) -> Result<(), BrokerError> {
    let ids = owned_ids(ids);
    checked_manifests(descriptor, &ids, catalog)?;
    tracing::info!(contract = %descriptor.id, interfaces = ?ids, "interfaces replaced");
    descriptor.implements = ids.into_iter().collect();
    Ok(())
}

/// Declares every satisfied catalog interface. Returns the newly added ids.
pub fn attach_satisfied(
    descriptor: &mut ContractDescriptor,
    catalog: &dyn InterfaceCatalog,
) -> Vec<String> {
    let added: Vec<String> = suggest_interfaces(descriptor, catalog)
        .ranked
        .into_iter()
        .filter(|m| !m.already_implemented)
        .map(|m| m.interface_id)
        .collect();
    descriptor.implements.extend(added.iter().cloned());
    added
}

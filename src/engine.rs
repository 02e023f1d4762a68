//! Mutation decision engine
//!
//! Decides, per object, whether the default-annotation policy must be
//! applied. The decision reads only the object's identity, its annotations,
//! and the immutable policy table.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, info};

use crate::policy::PolicyTable;
use crate::system_namespaces;
use crate::{MUTATED_STATUS, STATUS_ANNOTATION};

/// The parts of an admitted object the engine looks at
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Namespace of the object
    pub namespace: String,
    /// Name of the object
    pub name: String,
    /// Current annotations (empty when the object has none)
    pub annotations: BTreeMap<String, String>,
}

impl ObjectDescriptor {
    /// Build a descriptor from object metadata.
    ///
    /// Objects being created often have no `metadata.namespace` yet; in that
    /// case `request_namespace` is used.
    pub fn from_metadata(metadata: &ObjectMeta, request_namespace: Option<&str>) -> Self {
        let namespace = metadata
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .or(request_namespace)
            .unwrap_or_default()
            .to_string();

        Self {
            namespace,
            name: metadata.name.clone().unwrap_or_default(),
            annotations: metadata.annotations.clone().unwrap_or_default(),
        }
    }

    /// Evaluate [`should_mutate`] for this object
    pub fn should_mutate<S: AsRef<str>>(&self, excluded: &[S], table: &PolicyTable) -> bool {
        should_mutate(
            &self.namespace,
            &self.name,
            &self.annotations,
            excluded,
            table,
        )
    }
}

/// Whether the annotations carry the "already mutated" status marker
pub fn already_mutated(annotations: &BTreeMap<String, String>) -> bool {
    annotations
        .get(STATUS_ANNOTATION)
        .is_some_and(|status| status.to_lowercase() == MUTATED_STATUS)
}

/// Decide whether the object needs its default annotations applied.
///
/// Returns `true` only when all of these hold:
/// 1. `namespace` is not one of `excluded`
/// 2. an entry in `table` matches `name` case-insensitively
/// 3. the status marker does not already read `mutated`
pub fn should_mutate<S: AsRef<str>>(
    namespace: &str,
    name: &str,
    annotations: &BTreeMap<String, String>,
    excluded: &[S],
    table: &PolicyTable,
) -> bool {
    if system_namespaces::is_excluded(namespace, excluded) {
        info!(
            namespace = %namespace,
            name = %name,
            "Skipping mutation for object in excluded namespace"
        );
        return false;
    }

    let matched = table.find(name).is_some();
    debug!(
        namespace = %namespace,
        name = %name,
        matched,
        "Checked default annotation policy"
    );

    let required = matched && !already_mutated(annotations);
    info!(
        namespace = %namespace,
        name = %name,
        required,
        "Mutation policy evaluated"
    );
    required
}

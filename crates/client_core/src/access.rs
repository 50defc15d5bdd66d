use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared::domain::Role;

/// What a capability grant allows on a resource; serialized uppercase to
/// match the dashboard's gating convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    View,
    Write,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Category,
    Product,
    Employee,
    BankAccount,
    Sale,
}

/// Per-resource capability grants derived from the principal's roles. View
/// code gates UI actions on this; the server still enforces its own checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessMap(HashMap<Resource, Vec<Capability>>);

impl AccessMap {
    pub fn allows(&self, resource: Resource, capability: Capability) -> bool {
        self.0
            .get(&resource)
            .is_some_and(|caps| caps.contains(&capability))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pure mapping from roles to capability grants; the union of every role's
/// grants, without duplicates.
pub fn derive_access(roles: &[Role]) -> AccessMap {
    let mut grants: HashMap<Resource, Vec<Capability>> = HashMap::new();
    for role in roles {
        for (resource, caps) in role_grants(*role) {
            let entry = grants.entry(*resource).or_default();
            for cap in *caps {
                if !entry.contains(cap) {
                    entry.push(*cap);
                }
            }
        }
    }
    AccessMap(grants)
}

fn role_grants(role: Role) -> &'static [(Resource, &'static [Capability])] {
    use Capability::{Delete, View, Write};

    match role {
        Role::Owner => &[
            (Resource::Category, &[View, Write, Delete]),
            (Resource::Product, &[View, Write, Delete]),
            (Resource::Employee, &[View, Write, Delete]),
            (Resource::BankAccount, &[View, Write, Delete]),
            (Resource::Sale, &[View, Write, Delete]),
        ],
        Role::Manager => &[
            (Resource::Category, &[View, Write]),
            (Resource::Product, &[View, Write]),
            (Resource::Employee, &[View]),
            (Resource::Sale, &[View, Write]),
        ],
        Role::Cashier => &[
            (Resource::Product, &[View]),
            (Resource::Sale, &[View, Write]),
        ],
        Role::Support => &[(Resource::Product, &[View]), (Resource::Sale, &[View])],
    }
}

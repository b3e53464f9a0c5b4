use serde::{Deserialize, Serialize};

use super::ids::TenantId;

/// A subscribing organization. Only active tenants are synchronized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub active: bool,
}

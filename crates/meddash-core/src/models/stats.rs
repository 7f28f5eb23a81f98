use serde::Serialize;

use super::{AdminUser, Pharmacy};

/// Figures shown on the Statistics view, derived from the listed collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_pharmacies: usize,
    pub active_pharmacies: usize,
    pub inactive_pharmacies: usize,
}

impl DashboardStats {
    pub fn from_collections(users: &[AdminUser], pharmacies: &[Pharmacy]) -> Self {
        let active = pharmacies.iter().filter(|p| p.is_active()).count();
        Self {
            total_users: users.len(),
            total_pharmacies: pharmacies.len(),
            active_pharmacies: active,
            inactive_pharmacies: pharmacies.len() - active,
        }
    }
}

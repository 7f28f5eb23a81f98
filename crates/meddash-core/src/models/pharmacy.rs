use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum PharmacyStatus {
    Active,
    Inactive,
}

impl PharmacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PharmacyStatus::Active => "active",
            PharmacyStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for PharmacyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Pharmacy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub status: PharmacyStatus,
    #[serde(rename = "licenseNumber", default)]
    pub license_number: String,
}

impl Pharmacy {
    pub fn is_active(&self) -> bool {
        self.status == PharmacyStatus::Active
    }
}

//! Table bindings for the admin collections.

use crate::models::{AdminUser, Pharmacy};
use crate::utils::format_phone;

use super::list::Resource;

impl Resource for Pharmacy {
    const COLLECTION: &'static str = "pharmacies";
    const SINGULAR: &'static str = "pharmacy";
    const PLURAL: &'static str = "pharmacies";
    const COLUMNS: &'static [&'static str] =
        &["Name", "Address", "Phone", "Email", "License", "Status"];

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn cell(&self, column: usize) -> String {
        match column {
            0 => self.name.clone(),
            1 => self.address.clone(),
            2 => format_phone(&self.phone),
            3 => self.email.clone(),
            4 => self.license_number.clone(),
            5 => self.status.to_string(),
            _ => String::new(),
        }
    }
}

impl Resource for AdminUser {
    const COLLECTION: &'static str = "users";
    const SINGULAR: &'static str = "user";
    const PLURAL: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["Name", "Email", "Phone", "Role"];

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> String {
        self.full_name()
    }

    fn cell(&self, column: usize) -> String {
        match column {
            0 => self.full_name(),
            1 => self.email.clone(),
            2 => format_phone(&self.phone_number),
            3 => self.role.clone(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PharmacyStatus;

    #[test]
    fn test_pharmacy_cells() {
        let pharmacy = Pharmacy {
            id: "7".to_string(),
            name: "Corner Drugs".to_string(),
            address: "1 Main St".to_string(),
            phone: "5551234567".to_string(),
            email: "corner@example.com".to_string(),
            status: PharmacyStatus::Inactive,
            license_number: "LIC-7".to_string(),
        };
        assert_eq!(pharmacy.id(), "7");
        assert_eq!(pharmacy.cell(0), "Corner Drugs");
        assert_eq!(pharmacy.cell(5), "inactive");
        assert_eq!(pharmacy.cell(Pharmacy::COLUMNS.len()), "");
    }

    #[test]
    fn test_user_cells() {
        let user = AdminUser {
            id: "u1".to_string(),
            given_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: String::new(),
            role: "pharmacist".to_string(),
        };
        assert_eq!(user.display_name(), "Ada Lovelace");
        assert_eq!(user.cell(3), "pharmacist");
        assert_eq!(AdminUser::COLUMNS.len(), 4);
    }
}

use serde::{Deserialize, Serialize};

/// Profile of the signed-in administrator, as returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    #[serde(rename = "givenName")]
    pub given_name: String,
    #[serde(rename = "familyName")]
    pub family_name: String,
    pub email: String,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    #[serde(rename = "user_role")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(rename = "cognitoId", default, skip_serializing_if = "Option::is_none")]
    pub cognito_id: Option<String>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }

    /// Two-letter avatar placeholder, e.g. "AD" for "Ada Douglas".
    pub fn initials(&self) -> String {
        let initials: String = [&self.given_name, &self.family_name]
            .iter()
            .filter_map(|part| part.chars().next())
            .flat_map(|c| c.to_uppercase())
            .collect();
        if initials.is_empty() {
            "?".to_string()
        } else {
            initials
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of a successful `POST /auth/login` or `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub user: UserProfile,
}

/// A platform user as listed on the Users view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AdminUser {
    pub id: String,
    #[serde(rename = "givenName")]
    pub given_name: String,
    #[serde(rename = "familyName")]
    pub family_name: String,
    pub email: String,
    #[serde(rename = "phoneNumber", default)]
    pub phone_number: String,
    #[serde(rename = "user_role", default)]
    pub role: String,
}

impl AdminUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(given: &str, family: &str) -> UserProfile {
        UserProfile {
            given_name: given.to_string(),
            family_name: family.to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "5551234567".to_string(),
            role: "admin".to_string(),
            avatar: None,
            cognito_id: None,
        }
    }

    #[test]
    fn test_profile_wire_names() {
        let json = r#"{
            "givenName": "Ada",
            "familyName": "Douglas",
            "email": "ada@example.com",
            "phoneNumber": "5551234567",
            "user_role": "admin",
            "cognitoId": "abc-123"
        }"#;
        let parsed: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.given_name, "Ada");
        assert_eq!(parsed.role, "admin");
        assert_eq!(parsed.avatar, None);
        assert_eq!(parsed.cognito_id.as_deref(), Some("abc-123"));

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out["user_role"], "admin");
        assert!(out.get("avatar").is_none());
    }

    #[test]
    fn test_initials() {
        assert_eq!(profile("Ada", "Douglas").initials(), "AD");
        assert_eq!(profile("émile", "").initials(), "É");
        assert_eq!(profile("", "").initials(), "?");
    }

    #[test]
    fn test_full_name_trims_missing_parts() {
        assert_eq!(profile("Ada", "Douglas").full_name(), "Ada Douglas");
        assert_eq!(profile("Ada", "").full_name(), "Ada");
    }

    #[test]
    fn test_login_response_parses() {
        let json = r#"{
            "accessToken": "tok",
            "user": {"givenName": "A", "familyName": "B", "email": "e",
                     "phoneNumber": "p", "user_role": "admin"}
        }"#;
        let parsed: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "tok");
        assert_eq!(parsed.user.family_name, "B");
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of known user identities. `shared` is handled separately
/// (see [`is_shared`]) since it names a memory collection, not a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserId {
    Dad,
    Mom,
    Teen,
    Child,
}

impl UserId {
    pub const ALL: [UserId; 4] = [UserId::Dad, UserId::Mom, UserId::Teen, UserId::Child];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserId::Dad => "dad",
            UserId::Mom => "mom",
            UserId::Teen => "teen",
            UserId::Child => "child",
        }
    }

    pub fn role(&self) -> Role {
        match self {
            UserId::Dad | UserId::Mom => Role::Admin,
            UserId::Teen | UserId::Child => Role::User,
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dad" => Ok(UserId::Dad),
            "mom" => Ok(UserId::Mom),
            "teen" => Ok(UserId::Teen),
            "child" => Ok(UserId::Child),
            _ => Err(()),
        }
    }
}

/// The literal name of the shared, cross-user read-only memory collection.
/// Not a member of [`UserId`] — it names a collection, not a person.
pub const SHARED: &str = "shared";

pub fn is_shared(user_id: &str) -> bool {
    user_id == SHARED
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPreference {
    Fast,
    Full,
    None,
}

/// Per-user profile: role, an optional forced model routing preference, and
/// the system prompt used to seed chat completions for that user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub role: Role,
    #[serde(default)]
    pub model_preference: Option<ModelPreference>,
    pub system_prompt: String,
}

/// The full, closed registry of user profiles. Constructed once from config
/// at startup and shared read-only across request handlers.
#[derive(Debug, Clone)]
pub struct Profiles(HashMap<UserId, Profile>);

impl Profiles {
    pub fn new(map: HashMap<UserId, Profile>) -> Self {
        Self(map)
    }

    pub fn get(&self, user_id: UserId) -> Option<&Profile> {
        self.0.get(&user_id)
    }

    pub fn set(&mut self, user_id: UserId, profile: Profile) {
        self.0.insert(user_id, profile);
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.get(user_id)
            .map(|p| p.role.is_admin())
            .unwrap_or(false)
    }
}

impl Default for Profiles {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert(
            UserId::Dad,
            Profile {
                role: Role::Admin,
                model_preference: None,
                system_prompt: "You are a helpful family assistant speaking with Dad.".into(),
            },
        );
        map.insert(
            UserId::Mom,
            Profile {
                role: Role::Admin,
                model_preference: None,
                system_prompt: "You are a helpful family assistant speaking with Mom.".into(),
            },
        );
        map.insert(
            UserId::Teen,
            Profile {
                role: Role::User,
                model_preference: None,
                system_prompt: "You are a helpful family assistant speaking with a teenager. Keep answers concise.".into(),
            },
        );
        map.insert(
            UserId::Child,
            Profile {
                role: Role::User,
                model_preference: None,
                system_prompt: "You are a friendly, gentle assistant speaking with a young child. Keep language simple and age-appropriate.".into(),
            },
        );
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_str() {
        for u in UserId::ALL {
            assert_eq!(UserId::from_str(u.as_str()), Ok(u));
        }
    }

    #[test]
    fn admin_roles() {
        assert_eq!(UserId::Dad.role(), Role::Admin);
        assert_eq!(UserId::Mom.role(), Role::Admin);
        assert_eq!(UserId::Teen.role(), Role::User);
        assert_eq!(UserId::Child.role(), Role::User);
    }

    #[test]
    fn shared_is_not_a_user() {
        assert!(UserId::from_str(SHARED).is_err());
        assert!(is_shared("shared"));
        assert!(!is_shared("dad"));
    }

    #[test]
    fn default_profiles_cover_all_users() {
        let profiles = Profiles::default();
        for u in UserId::ALL {
            assert!(profiles.get(u).is_some());
        }
        assert!(profiles.is_admin(UserId::Dad));
        assert!(!profiles.is_admin(UserId::Teen));
    }
}

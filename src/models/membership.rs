use serde::{Deserialize, Deserializer, Serialize};

/// Body of a membership change: the usernames to add to a project.
///
/// ```json
/// {"members": [{"key": "bob"}, {"key": "alice"}]}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub members: Vec<MemberKey>,
}

/// `"members": null` reads as an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<MemberKey>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<MemberKey>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberKey {
    pub key: String,
}

impl MembershipRequest {
    pub fn from_usernames<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: usernames
                .into_iter()
                .map(|key| MemberKey { key: key.into() })
                .collect(),
        }
    }

    /// Usernames in request order.
    pub fn usernames(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.key.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_or_absent_members_read_as_empty() {
        for body in [r#"{"members": null}"#, "{}"] {
            let request: MembershipRequest = serde_json::from_str(body).unwrap();
            assert!(request.members.is_empty(), "{body}");
        }
    }

    #[test]
    fn keys_keep_request_order() {
        let request: MembershipRequest =
            serde_json::from_str(r#"{"members": [{"key": "bob"}, {"key": "alice"}]}"#).unwrap();
        assert_eq!(request.usernames(), vec!["bob", "alice"]);
    }
}

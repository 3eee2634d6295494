use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }
}

/// Who is asking. Resolved by the caller's session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(i64),
}

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }
}

impl From<Option<i64>> for Viewer {
    fn from(id: Option<i64>) -> Self {
        id.map_or(Viewer::Anonymous, Viewer::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_from_session_id() {
        let anonymous = Viewer::from(None::<i64>);
        assert_eq!(anonymous, Viewer::default());
        assert!(!anonymous.is_authenticated());
        assert_eq!(anonymous.user_id(), None);

        let viewer = Viewer::from(Some(7));
        assert!(viewer.is_authenticated());
        assert_eq!(viewer.user_id(), Some(7));
    }
}

use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiError;
use crate::schema::{Id, User, UserRole};

use super::permissions::ActionType;

/// What the SDK needs to know about a user, whatever concrete type carries it.
pub trait Account {
    fn id(&self) -> Id;
    fn username(&self) -> &str;
}

impl Account for User {
    fn id(&self) -> Id {
        self.id
    }

    fn username(&self) -> &str {
        &self.username
    }
}

/// Identity of the acting user as established by the embedding application.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl Session {
    pub fn new(user_id: Id, username: &str, role: UserRole) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::forbidden(
                "You don't have permission to perform this action",
            ));
        }
        Ok(())
    }

    /// Authors manage their own rows; `ManageAllRecipes` manages everyone's.
    pub fn authenticate_owner(&self, author_id: Id) -> Result<(), ApiError> {
        self.authenticate(ActionType::ManageOwnRecipes)?;

        match self.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(()),
            Err(_) if author_id == self.user_id => Ok(()),
            Err(_) => Err(ApiError::forbidden("Only the author may change this recipe")),
        }
    }
}

impl Account for Session {
    fn id(&self) -> Id {
        self.user_id
    }

    fn username(&self) -> &str {
        &self.username
    }
}

impl From<&User> for Session {
    fn from(value: &User) -> Self {
        Session {
            user_id: value.id,
            username: value.username.to_owned(),
            role: value.role.to_owned(),
        }
    }
}

/// Anonymous callers may only read.
pub fn require_session(viewer: Option<&Session>) -> Result<&Session, ApiError> {
    viewer.ok_or(ApiError::Unauthorized)
}

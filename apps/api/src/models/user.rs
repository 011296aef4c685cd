use uuid::Uuid;

/// The slice of a user account the CV needs: who owns the profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOwner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// What happens to a member's birthday role on a role update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Grant,
    Revoke,
    Keep,
}

impl RoleAction {
    pub fn verb(self) -> &'static str {
        match self {
            RoleAction::Grant => "gave",
            RoleAction::Revoke => "took",
            RoleAction::Keep => "kept",
        }
    }
}

/// Celebrants get the role for the day, everyone else loses it
pub fn determine_role_action(celebrating: bool, holds_role: bool) -> RoleAction {
    if celebrating == holds_role {
        RoleAction::Keep
    } else if celebrating {
        RoleAction::Grant
    } else {
        RoleAction::Revoke
    }
}

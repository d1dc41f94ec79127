use serde::{Deserialize, Serialize};

use super::principal::User;
use super::role::{normalize_role, CanonicalRole};

/// Capability flags derived from a role. Recomputed on every read, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub can_view_dashboard: bool,
    pub can_view_projects: bool,
    pub can_view_all_projects: bool,
    pub can_create_project: bool,
    pub can_edit_project: bool,
    pub can_delete_project: bool,
    pub can_create_main_task: bool,
    pub can_create_sub_task: bool,
    pub can_assign_task: bool,
    pub can_approve_task: bool,
    pub can_accept_task: bool,
    pub can_update_task_progress: bool,
    pub can_view_reports: bool,
    pub can_export_reports: bool,
    pub can_view_department_stats: bool,
    pub can_manage_users: bool,
    pub can_manage_departments: bool,
    pub can_view_system_logs: bool,
}

impl PermissionSet {
    /// Each flag is its own predicate over `role`; none is derived from another flag.
    pub fn for_role(role: CanonicalRole) -> Self {
        use CanonicalRole::*;
        PermissionSet {
            can_view_dashboard: true,
            can_view_projects: matches!(role, Admin | Director | Pmo | Leader | Staff),
            can_view_all_projects: matches!(role, Admin | Director | Pmo),
            can_create_project: role == Pmo,
            can_edit_project: role == Pmo,
            can_delete_project: role == Pmo,
            can_create_main_task: role == Pmo,
            can_create_sub_task: role == Leader,
            can_assign_task: matches!(role, Pmo | Leader),
            can_approve_task: matches!(role, Pmo | Leader),
            can_accept_task: matches!(role, Leader | Staff),
            can_update_task_progress: matches!(role, Leader | Staff),
            can_view_reports: matches!(role, Admin | Director | Pmo),
            can_export_reports: matches!(role, Director | Pmo),
            can_view_department_stats: matches!(role, Director | Leader),
            can_manage_users: role == Admin,
            can_manage_departments: role == Admin,
            can_view_system_logs: role == Admin,
        }
    }

    /// Only the flags open to every signed-in user.
    pub fn baseline() -> Self {
        PermissionSet { can_view_dashboard: true, ..Default::default() }
    }

    /// Evaluate a raw backend token. Unrecognized tokens get the baseline set.
    pub fn for_raw_role(raw: &str) -> Self {
        match normalize_role(raw) {
            Ok(role) => Self::for_role(role),
            Err(_) => Self::baseline(),
        }
    }

    /// Names of the flags that are set, in declaration order.
    pub fn granted(&self) -> Vec<&'static str> {
        let flags = [
            ("canViewDashboard", self.can_view_dashboard),
            ("canViewProjects", self.can_view_projects),
            ("canViewAllProjects", self.can_view_all_projects),
            ("canCreateProject", self.can_create_project),
            ("canEditProject", self.can_edit_project),
            ("canDeleteProject", self.can_delete_project),
            ("canCreateMainTask", self.can_create_main_task),
            ("canCreateSubTask", self.can_create_sub_task),
            ("canAssignTask", self.can_assign_task),
            ("canApproveTask", self.can_approve_task),
            ("canAcceptTask", self.can_accept_task),
            ("canUpdateTaskProgress", self.can_update_task_progress),
            ("canViewReports", self.can_view_reports),
            ("canExportReports", self.can_export_reports),
            ("canViewDepartmentStats", self.can_view_department_stats),
            ("canManageUsers", self.can_manage_users),
            ("canManageDepartments", self.can_manage_departments),
            ("canViewSystemLogs", self.can_view_system_logs),
        ];
        flags.iter().filter(|(_, on)| *on).map(|(name, _)| *name).collect()
    }
}

/// Permissions of the current user, or `None` when nobody is signed in.
pub fn permissions_for(user: Option<&User>) -> Option<PermissionSet> {
    user.map(|u| PermissionSet::for_role(u.role))
}

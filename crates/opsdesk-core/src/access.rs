//! Ownership and role rules that go beyond plain role checks.

use opsdesk_types::{Project, Role, Task, UserId};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Caller's user id.
    pub id: UserId,
    /// Caller's current role.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether the caller is an admin.
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether the caller's role is one of `roles`.
    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Admins and managers see records created by anyone.
    pub const fn sees_everything(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }
}

/// Admins, the task's creator, and its assignee may update a task.
pub fn can_update_task(actor: &Actor, task: &Task) -> bool {
    actor.is_admin() || task.created_by == actor.id || task.assigned_to == Some(actor.id)
}

/// Admins and the task's creator may delete a task.
pub fn can_delete_task(actor: &Actor, task: &Task) -> bool {
    actor.is_admin() || task.created_by == actor.id
}

/// Admins and the project's manager may update a project.
pub fn can_manage_project(actor: &Actor, project: &Project) -> bool {
    actor.is_admin() || project.manager == actor.id
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use opsdesk_types::{Priority, ProjectId, ProjectStatus, TaskId, TaskStatus};

    use super::*;

    fn task(created_by: UserId, assigned_to: Option<UserId>) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId::new(),
            title: String::from("Count pallets"),
            description: None,
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            project: None,
            assigned_to,
            created_by,
            due_date: None,
            completed_at: None,
            estimated_hours: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn project(manager: UserId) -> Project {
        let now = Utc::now();
        Project {
            id: ProjectId::new(),
            name: String::from("Warehouse move"),
            description: None,
            status: ProjectStatus::Planning,
            priority: Priority::High,
            manager,
            team_members: Vec::new(),
            customer: None,
            start_date: None,
            end_date: None,
            budget: None,
            progress: 0,
            completed_at: None,
            created_by: manager,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn task_rules() {
        let owner = Actor::new(UserId::new(), Role::Employee);
        let assignee = Actor::new(UserId::new(), Role::Employee);
        let stranger = Actor::new(UserId::new(), Role::Manager);
        let admin = Actor::new(UserId::new(), Role::Admin);
        let t = task(owner.id, Some(assignee.id));

        assert!(can_update_task(&owner, &t));
        assert!(can_update_task(&assignee, &t));
        assert!(can_update_task(&admin, &t));
        assert!(!can_update_task(&stranger, &t));

        assert!(can_delete_task(&owner, &t));
        assert!(can_delete_task(&admin, &t));
        assert!(!can_delete_task(&assignee, &t));
        assert!(!can_delete_task(&stranger, &t));
    }

    #[test]
    fn project_rules() {
        let manager = Actor::new(UserId::new(), Role::Manager);
        let other_manager = Actor::new(UserId::new(), Role::Manager);
        let admin = Actor::new(UserId::new(), Role::Admin);
        let p = project(manager.id);

        assert!(can_manage_project(&manager, &p));
        assert!(can_manage_project(&admin, &p));
        assert!(!can_manage_project(&other_manager, &p));
    }

    #[test]
    fn role_helpers() {
        let employee = Actor::new(UserId::new(), Role::Employee);
        assert!(!employee.sees_everything());
        assert!(employee.has_role(&[Role::Employee, Role::Admin]));
        assert!(!employee.has_role(&[Role::Admin]));
        assert!(Actor::new(UserId::new(), Role::Manager).sees_everything());
    }
}

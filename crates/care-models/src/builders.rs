//! Builder patterns for complex types.

use crate::ids::{CustomerId, OrganizationId, ProjectId, VehicleId};
use crate::work_order::{NewWorkOrder, Priority};

/// Builder for creating work order requests with a fluent API.
#[derive(Debug, Clone)]
pub struct WorkOrderBuilder {
    organization_id: OrganizationId,
    customer_id: CustomerId,
    vehicle_id: VehicleId,
    title: String,
    project_id: Option<ProjectId>,
    priority: Option<Priority>,
    description: Option<String>,
}

impl WorkOrderBuilder {
    /// Creates a new WorkOrderBuilder with required fields.
    pub fn new(
        organization_id: OrganizationId,
        customer_id: CustomerId,
        vehicle_id: VehicleId,
        title: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            customer_id,
            vehicle_id,
            title: title.into(),
            project_id: None,
            priority: None,
            description: None,
        }
    }

    /// Sets the project the job is billed under.
    pub fn project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the priority (defaults to normal).
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds the request.
    pub fn build(self) -> NewWorkOrder {
        NewWorkOrder {
            organization_id: self.organization_id,
            project_id: self.project_id,
            customer_id: self.customer_id,
            vehicle_id: self.vehicle_id,
            priority: self.priority.unwrap_or_default(),
            title: self.title,
            description: self.description,
        }
    }
}

/// Convenience methods on NewWorkOrder for creating builders.
impl NewWorkOrder {
    /// Creates a builder for a new work order.
    pub fn builder(
        organization_id: OrganizationId,
        customer_id: CustomerId,
        vehicle_id: VehicleId,
        title: impl Into<String>,
    ) -> WorkOrderBuilder {
        WorkOrderBuilder::new(organization_id, customer_id, vehicle_id, title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let org = OrganizationId::new();
        let request =
            NewWorkOrder::builder(org, CustomerId::new(), VehicleId::new(), "Oil change").build();

        assert_eq!(request.organization_id, org);
        assert_eq!(request.title, "Oil change");
        assert_eq!(request.priority, Priority::Normal);
        assert!(request.project_id.is_none());
        assert!(request.description.is_none());
    }

    #[test]
    fn test_builder_with_options() {
        let project = ProjectId::new();
        let request = NewWorkOrder::builder(
            OrganizationId::new(),
            CustomerId::new(),
            VehicleId::new(),
            "Transmission rebuild",
        )
        .project(project)
        .priority(Priority::Urgent)
        .description("Slipping in third gear")
        .build();

        assert_eq!(request.project_id, Some(project));
        assert_eq!(request.priority, Priority::Urgent);
        assert_eq!(request.description.as_deref(), Some("Slipping in third gear"));
    }
}

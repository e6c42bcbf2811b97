//! Work order filtering for queries.

use care_models::{CustomerId, OrganizationId, Priority, WorkOrder, WorkOrderStatus};

/// Filter criteria for listing work orders.
#[derive(Debug, Clone, Default)]
pub struct WorkOrderFilter {
    /// Filter by owning organization.
    pub organization_id: Option<OrganizationId>,
    /// Filter by customer.
    pub customer_id: Option<CustomerId>,
    /// Filter by status.
    pub status: Option<WorkOrderStatus>,
    /// Filter by priority.
    pub priority: Option<Priority>,
    /// Hide completed and canceled orders.
    pub open_only: bool,
}

impl WorkOrderFilter {
    /// Creates a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_status(mut self, status: WorkOrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Excludes terminal orders.
    pub fn open_only(mut self) -> Self {
        self.open_only = true;
        self
    }

    /// Returns true if the work order matches this filter.
    pub fn matches(&self, order: &WorkOrder) -> bool {
        if let Some(organization_id) = self.organization_id {
            if order.organization_id != organization_id {
                return false;
            }
        }

        if let Some(customer_id) = self.customer_id {
            if order.customer_id != customer_id {
                return false;
            }
        }

        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }

        if let Some(priority) = self.priority {
            if order.priority != priority {
                return false;
            }
        }

        if self.open_only && order.is_terminal() {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_models::{NewWorkOrder, UserId, VehicleId};
    use chrono::Utc;

    fn make_order(org: OrganizationId, priority: Priority) -> WorkOrder {
        let request = NewWorkOrder::builder(org, CustomerId::new(), VehicleId::new(), "Job")
            .priority(priority)
            .build();
        WorkOrder::open(request, UserId::new(), Utc::now())
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let order = make_order(OrganizationId::new(), Priority::Normal);
        assert!(WorkOrderFilter::new().matches(&order));
    }

    #[test]
    fn test_filter_by_organization() {
        let org = OrganizationId::new();
        let filter = WorkOrderFilter::new().with_organization(org);

        assert!(filter.matches(&make_order(org, Priority::Normal)));
        assert!(!filter.matches(&make_order(OrganizationId::new(), Priority::Normal)));
    }

    #[test]
    fn test_filter_by_status() {
        let filter = WorkOrderFilter::new().with_status(WorkOrderStatus::Draft);

        let draft = make_order(OrganizationId::new(), Priority::Normal);
        let mut scheduled = draft.clone();
        scheduled.status = WorkOrderStatus::Scheduled;

        assert!(filter.matches(&draft));
        assert!(!filter.matches(&scheduled));
    }

    #[test]
    fn test_open_only_hides_terminal() {
        let filter = WorkOrderFilter::new().open_only();

        let open = make_order(OrganizationId::new(), Priority::Normal);
        let mut canceled = open.clone();
        canceled.status = WorkOrderStatus::Canceled;

        assert!(filter.matches(&open));
        assert!(!filter.matches(&canceled));
    }

    #[test]
    fn test_combined_filters() {
        let org = OrganizationId::new();
        let filter = WorkOrderFilter::new()
            .with_organization(org)
            .with_priority(Priority::Urgent);

        assert!(filter.matches(&make_order(org, Priority::Urgent)));
        assert!(!filter.matches(&make_order(org, Priority::Low)));
        assert!(!filter.matches(&make_order(OrganizationId::new(), Priority::Urgent)));
    }
}

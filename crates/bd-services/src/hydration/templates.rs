//! Template-based assembly
//!
//! Each template reference resolves into a concrete value copy at assembly
//! time. Instantiated trees never share state with the catalog: editing a
//! template afterwards must not retroactively alter an assembled package.

use std::collections::HashSet;

use bd_core::{CrmError, CrmResult, ValidationErrors};
use bd_db::TemplateCatalog;
use bd_models::{Phase, PhaseNode, WorkItem, WorkPackage, WorkPackageTree};

use super::{HydrationService, TemplateAssembly};

impl HydrationService {
    pub(super) async fn build_from_templates(
        &self,
        request: TemplateAssembly,
    ) -> CrmResult<WorkPackageTree> {
        let mut errors = ValidationErrors::new();
        if request.title.trim().is_empty() {
            errors.add("title", "is required");
        }
        if request.phases.is_empty() {
            errors.add("phases", "must reference at least one phase template");
        }
        if !errors.is_empty() {
            return Err(CrmError::Validation(errors));
        }

        let mut work_package = WorkPackage::new(request.title, request.contact_id);
        work_package.company_id = request.company_id;
        work_package.description = request.description;
        work_package.total_cost = request.total_cost;
        work_package.effective_start_date = request.effective_start_date;
        let mut tree = WorkPackageTree::new(work_package);

        let mut taken_positions = HashSet::new();
        for (index, phase_ref) in request.phases.iter().enumerate() {
            let template = self
                .catalog()
                .phase_template(phase_ref.phase_template_id)
                .await?
                .ok_or_else(|| {
                    CrmError::not_found("PhaseTemplate", "id", phase_ref.phase_template_id)
                })?;

            // Explicit position wins, then the catalog's default ordering,
            // then request order.
            let position = phase_ref
                .position
                .or((template.default_position >= 1).then_some(template.default_position))
                .unwrap_or(index as i32 + 1);
            if !taken_positions.insert(position) {
                let mut errors = ValidationErrors::new();
                errors.add(
                    format!("phases[{}].position", index),
                    format!("position {} is already taken", position),
                );
                return Err(CrmError::Validation(errors));
            }

            // Value copy: the tree owns its own strings and defaults from here on
            let mut phase = Phase::new(template.name, position);
            phase.description = template.description;
            let mut node = PhaseNode::new(phase);

            for deliverable_id in &phase_ref.deliverables {
                let deliverable = self
                    .catalog()
                    .deliverable_template(*deliverable_id)
                    .await?
                    .ok_or_else(|| {
                        CrmError::not_found("DeliverableTemplate", "id", *deliverable_id)
                    })?;

                node.items.push(WorkItem {
                    id: None,
                    work_package_id: None,
                    phase_id: None,
                    deliverable_type: deliverable.deliverable_type,
                    deliverable_label: deliverable.deliverable_label,
                    description: deliverable.description,
                    quantity: deliverable.default_quantity,
                    unit_of_measure: deliverable.default_unit_of_measure,
                    estimated_hours_each: deliverable.default_estimated_hours_each,
                    status: Default::default(),
                });
            }
            tree.phases.push(node);
        }

        Ok(tree)
    }
}

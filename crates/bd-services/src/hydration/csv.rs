//! CSV assembly and idempotent merge
//!
//! Rows group into phases by `phaseName` (first-seen order when
//! `phasePosition` is absent). Identity rules make re-import safe: a phase is
//! `(work_package_id, name, position)`, an item is `(work_package_id,
//! phase_id, deliverable_label)`. Matches update mutable fields in place;
//! `deliverable_type` is immutable per identity. Any row failure aborts the
//! whole batch before anything is written.

use std::collections::{HashMap, HashSet};

use bd_core::{CrmError, CrmResult, ValidationErrors};
use bd_models::{CsvRow, ItemStatus, Phase, PhaseNode, UnitOfMeasure, WorkItem, WorkPackage, WorkPackageTree};
use validator::Validate;

use super::{CsvAssembly, HydrationService};

#[derive(Debug)]
struct ParsedRow {
    index: usize,
    phase_name: String,
    phase_position: Option<i32>,
    deliverable_type: String,
    deliverable_label: String,
    description: Option<String>,
    quantity: i64,
    unit_of_measure: UnitOfMeasure,
    estimated_hours_each: f64,
    status: ItemStatus,
}

impl HydrationService {
    /// Build a brand-new work package from CSV rows.
    pub(super) fn build_from_csv(&self, request: CsvAssembly) -> CrmResult<WorkPackageTree> {
        let mut errors = ValidationErrors::new();
        let contact_id = match request.contact_id {
            Some(id) => id,
            None => {
                errors.add("contactId", "is required when creating a work package");
                0
            }
        };
        let title = match request.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => {
                errors.add("title", "is required when creating a work package");
                String::new()
            }
        };
        if request.rows.is_empty() {
            errors.add("rows", "must contain at least one row");
        }
        if !errors.is_empty() {
            return Err(CrmError::Validation(errors));
        }

        let parsed = parse_rows(&request.rows)?;

        let mut work_package = WorkPackage::new(title, contact_id);
        work_package.company_id = request.company_id;
        work_package.effective_start_date = request.effective_start_date;
        let mut tree = WorkPackageTree::new(work_package);

        apply_first_row_fields(&mut tree, &request.rows);
        merge_rows_into_tree(&mut tree, parsed)?;
        Ok(tree)
    }

    /// Merge CSV rows into an existing tree. Safe to re-run with identical
    /// input any number of times.
    pub(super) fn merge_csv(
        &self,
        mut tree: WorkPackageTree,
        request: CsvAssembly,
    ) -> CrmResult<WorkPackageTree> {
        if request.rows.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("rows", "must contain at least one row");
            return Err(CrmError::Validation(errors));
        }
        let parsed = parse_rows(&request.rows)?;

        if request.effective_start_date.is_some() {
            tree.work_package.effective_start_date = request.effective_start_date;
        }
        apply_first_row_fields(&mut tree, &request.rows);
        merge_rows_into_tree(&mut tree, parsed)?;
        Ok(tree)
    }
}

/// Row errors are keyed by the wire (camelCase) field names the client sent,
/// not the internal snake_case ones.
fn wire_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// The first row alone may carry engagement-level fields.
fn apply_first_row_fields(tree: &mut WorkPackageTree, rows: &[CsvRow]) {
    if let Some(first) = rows.first() {
        if let Some(description) = &first.proposal_description {
            tree.work_package.description = Some(description.clone());
        }
        if let Some(total_cost) = first.proposal_total_cost {
            tree.work_package.total_cost = Some(total_cost);
        }
    }
}

/// Validate and normalize every row, collecting all failures before
/// reporting: the caller gets one error carrying every offending row index.
fn parse_rows(rows: &[CsvRow]) -> CrmResult<Vec<ParsedRow>> {
    let mut errors = ValidationErrors::new();
    let mut parsed = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        if let Err(field_errors) = row.validate() {
            for (field, messages) in field_errors.field_errors() {
                for message in messages {
                    let text = message
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "is invalid".to_string());
                    errors.add_row(index, &wire_field(field), text);
                }
            }
        }

        let status = match row.status.parse::<ItemStatus>() {
            Ok(status) => status,
            Err(message) => {
                errors.add_row(index, "status", message);
                ItemStatus::default()
            }
        };

        parsed.push(ParsedRow {
            index,
            phase_name: row.phase_name.trim().to_string(),
            phase_position: row.phase_position,
            deliverable_type: row.deliverable_type.trim().to_string(),
            deliverable_label: row.deliverable_label.trim().to_string(),
            description: row.deliverable_description.clone(),
            quantity: row.quantity,
            unit_of_measure: UnitOfMeasure::parse_or_default(row.unit_of_measure.as_deref()),
            estimated_hours_each: row.estimated_hours_each,
            status,
        });
    }

    if !errors.is_empty() {
        return Err(CrmError::Validation(errors));
    }

    // The same identity may not claim two deliverable types in one batch.
    let mut claimed_types: HashMap<(String, String), String> = HashMap::new();
    for row in &parsed {
        let key = (row.phase_name.clone(), row.deliverable_label.clone());
        match claimed_types.get(&key) {
            Some(existing) if existing != &row.deliverable_type => {
                return Err(CrmError::conflict(format!(
                    "row {}: deliverable '{}' in phase '{}' is already claimed by type '{}'",
                    row.index, row.deliverable_label, row.phase_name, existing
                )));
            }
            _ => {
                claimed_types.insert(key, row.deliverable_type.clone());
            }
        }
    }

    Ok(parsed)
}

/// Group rows into phases and upsert them into the tree.
fn merge_rows_into_tree(tree: &mut WorkPackageTree, parsed: Vec<ParsedRow>) -> CrmResult<()> {
    // Group by phase name, preserving first-seen order
    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<ParsedRow>> = HashMap::new();
    for row in parsed {
        if !groups.contains_key(&row.phase_name) {
            group_order.push(row.phase_name.clone());
        }
        groups.entry(row.phase_name.clone()).or_default().push(row);
    }

    // Resolve each group's position: explicit wins, then the position of the
    // existing phase with the same name, then the next free slot.
    let mut taken: HashSet<i32> = tree.phases.iter().map(|node| node.phase.position).collect();
    let mut resolved: Vec<(String, i32, Vec<ParsedRow>)> = Vec::new();

    for name in group_order {
        let rows = groups.remove(&name).unwrap_or_default();

        let explicit = resolve_explicit_position(&rows)?;
        let position = match explicit {
            Some(position) => {
                // Positions are a total order: an explicit position held by a
                // differently-named phase is incompatible.
                if let Some(node) = tree
                    .phases
                    .iter()
                    .find(|node| node.phase.position == position)
                {
                    if node.phase.name != name {
                        return Err(CrmError::conflict(format!(
                            "phase position {} is already held by '{}'",
                            position, node.phase.name
                        )));
                    }
                }
                position
            }
            None => match existing_position_by_name(tree, &name)? {
                Some(position) => position,
                None => next_free_position(&taken),
            },
        };

        if resolved.iter().any(|(_, taken_pos, _)| *taken_pos == position) {
            return Err(CrmError::conflict(format!(
                "phase position {} claimed by two phase groups in one import",
                position
            )));
        }
        taken.insert(position);
        resolved.push((name, position, rows));
    }

    for (name, position, rows) in resolved {
        let node = find_or_insert_phase(tree, &name, position);
        for row in rows {
            upsert_item(node, row)?;
        }
    }

    tree.sort_phases();
    Ok(())
}

/// All explicit positions in one group must agree.
fn resolve_explicit_position(rows: &[ParsedRow]) -> CrmResult<Option<i32>> {
    let mut explicit: Option<i32> = None;
    for row in rows {
        if let Some(position) = row.phase_position {
            match explicit {
                Some(existing) if existing != position => {
                    let mut errors = ValidationErrors::new();
                    errors.add_row(
                        row.index,
                        "phasePosition",
                        format!(
                            "conflicts with position {} given earlier for phase '{}'",
                            existing, row.phase_name
                        ),
                    );
                    return Err(CrmError::Validation(errors));
                }
                _ => explicit = Some(position),
            }
        }
    }
    Ok(explicit)
}

/// Position of the unique existing phase with this name, if any. Two stored
/// phases sharing a name cannot be disambiguated without a position.
fn existing_position_by_name(tree: &WorkPackageTree, name: &str) -> CrmResult<Option<i32>> {
    let matches: Vec<i32> = tree
        .phases
        .iter()
        .filter(|node| node.phase.name == name)
        .map(|node| node.phase.position)
        .collect();
    match matches.as_slice() {
        [] => Ok(None),
        [position] => Ok(Some(*position)),
        _ => Err(CrmError::conflict(format!(
            "phase name '{}' is ambiguous; rows must carry phasePosition",
            name
        ))),
    }
}

fn next_free_position(taken: &HashSet<i32>) -> i32 {
    let mut candidate = 1;
    while taken.contains(&candidate) {
        candidate += 1;
    }
    candidate
}

fn find_or_insert_phase<'a>(
    tree: &'a mut WorkPackageTree,
    name: &str,
    position: i32,
) -> &'a mut PhaseNode {
    let index = tree
        .phases
        .iter()
        .position(|node| node.phase.name == name && node.phase.position == position);
    match index {
        Some(index) => &mut tree.phases[index],
        None => {
            tree.phases.push(PhaseNode::new(Phase::new(name, position)));
            tree.phases.last_mut().expect("phase just pushed")
        }
    }
}

/// Upsert one row into a phase: label match updates mutable fields in place,
/// no match appends. `deliverable_type` is immutable once the identity exists.
fn upsert_item(node: &mut PhaseNode, row: ParsedRow) -> CrmResult<()> {
    if let Some(item) = node
        .items
        .iter_mut()
        .find(|item| item.deliverable_label == row.deliverable_label)
    {
        if item.deliverable_type != row.deliverable_type {
            return Err(CrmError::conflict(format!(
                "row {}: deliverable '{}' already exists with type '{}', import says '{}'",
                row.index, row.deliverable_label, item.deliverable_type, row.deliverable_type
            )));
        }
        item.description = row.description;
        item.quantity = row.quantity;
        item.unit_of_measure = row.unit_of_measure;
        item.estimated_hours_each = row.estimated_hours_each;
        item.status = row.status;
        return Ok(());
    }

    node.items.push(WorkItem {
        id: None,
        work_package_id: node.phase.work_package_id,
        phase_id: node.phase.id,
        deliverable_type: row.deliverable_type,
        deliverable_label: row.deliverable_label,
        description: row.description,
        quantity: row.quantity,
        unit_of_measure: row.unit_of_measure,
        estimated_hours_each: row.estimated_hours_each,
        status: row.status,
    });
    Ok(())
}

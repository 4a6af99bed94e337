//! Table rendering for plans, journals and deployment results.

use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use stakeup_deploy::{
    ActionKind, ActionResult, DeploymentPlan, DeploymentResult, Journal,
    deployment_hash::action_fingerprint,
};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(header);
    table
}

fn kind(kind: &ActionKind) -> &'static str {
    match kind {
        ActionKind::CreateContract { .. } => "create",
        ActionKind::InvokeMethod { .. } => "call",
    }
}

fn result_cell(result: &ActionResult) -> String {
    match result {
        ActionResult::Deployed { address, .. } => address.to_string(),
        ActionResult::Called { tx_hash } => format!("tx {}", tx_hash),
    }
}

pub fn plan_table(plan: &DeploymentPlan) -> Table {
    let mut table = table(vec!["#", "Action", "Kind", "Description", "Depends on", "Exported as"]);

    for (i, action) in plan.actions().iter().enumerate() {
        let depends_on = action
            .dependencies()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let exported_as = plan
            .outputs()
            .iter()
            .filter(|(_, id)| **id == action.id)
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            (i + 1).to_string(),
            action.id.to_string(),
            kind(&action.kind).to_string(),
            action.describe(),
            depends_on,
            exported_as,
        ]);
    }

    table
}

pub fn status_table(plan: &DeploymentPlan, journal: &Journal) -> Table {
    let mut table = table(vec!["Action", "Status", "Result", "Completed at"]);

    for action in plan.actions() {
        let row = match journal.get(&action.id) {
            Some(entry) if entry.fingerprint == action_fingerprint(action) => vec![
                action.id.to_string(),
                "done".to_string(),
                result_cell(&entry.result),
                entry.completed_at.to_rfc3339(),
            ],
            Some(entry) => vec![
                action.id.to_string(),
                "changed".to_string(),
                result_cell(&entry.result),
                entry.completed_at.to_rfc3339(),
            ],
            None => vec![
                action.id.to_string(),
                "pending".to_string(),
                String::new(),
                String::new(),
            ],
        };
        table.add_row(row);
    }

    table
}

pub fn outputs_table(result: &DeploymentResult) -> Table {
    let mut table = table(vec!["Output", "Result"]);
    for (name, output) in &result.outputs {
        table.add_row(vec![name.clone(), result_cell(output)]);
    }
    table
}

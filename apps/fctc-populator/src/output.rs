//! Terminal rendering for reports

use colored::Colorize;
use fctc_core::{DependencyCounts, ItemTree, RowKind, RunSummary, TreeRow};

/// One tree row with steps in red, raw materials in cyan and tools in blue
pub fn render_row(row: &TreeRow) -> String {
    let label = match row.kind {
        RowKind::Step => row.label.red(),
        RowKind::RawMaterial => row.label.cyan(),
        RowKind::Tool => row.label.blue(),
    };
    let seen = if row.seen {
        " (seen)".yellow().to_string()
    } else {
        String::new()
    };
    format!("{}{}{}{}", row.prefix, row.connector, label, seen)
}

pub fn print_tree(tree: &ItemTree) {
    println!("Displaying information for: {}", tree.root.magenta());
    for row in &tree.rows {
        println!("{}", render_row(row));
    }
    println!("Counts: {}", tree.counts);
}

pub fn print_counts(name: &str, counts: &DependencyCounts) {
    println!(
        "{}: {} tools ({} unique), {} raw materials ({} unique)",
        name.magenta(),
        counts.total_tools,
        counts.unique_tools,
        counts.total_raw_materials,
        counts.unique_raw_materials
    );
}

pub fn print_summary(summary: &RunSummary) {
    println!(
        "{} {} requested, {} repaired, {} items in the graph",
        "Done:".green().bold(),
        summary.roots,
        summary.repaired,
        summary.items
    );
}

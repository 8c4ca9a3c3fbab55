use std::fmt::Write;

use comfy_table::Cell;

use crate::schemas::{ProjectRef, ProjectRefKind, ProjectsRefs};

use super::styling::{heading, highlight, muted, project_name};
use super::tables::{create_table, cyan_header, job_status_cell, kind_cell};

/// Prints a human-readable summary of the tracked refs to stdout.
///
/// Displays:
/// - Overview: project and ref counts, split by ref kind
/// - Refs: one row per tracked ref with its job count and the status of its
///   most recent job
pub fn print_summary(refs: &ProjectsRefs) {
    println!("{}", render_summary(refs));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{emoji} {}", heading(title));
}

fn count_kind(refs: &[&ProjectRef], kind: ProjectRefKind) -> usize {
    refs.iter().filter(|r| r.kind == kind).count()
}

/// Status of the job with the highest id, which is the one GitLab ran last.
fn latest_job_status(project_ref: &ProjectRef) -> Option<&str> {
    project_ref
        .jobs
        .values()
        .max_by_key(|job| job.id)
        .map(|job| job.status.as_str())
}

pub fn render_summary(refs: &ProjectsRefs) -> String {
    let mut output = String::new();

    let mut sorted: Vec<&ProjectRef> = refs.values().collect();
    sorted.sort_by(|a, b| {
        (&a.project.name, a.kind.as_str(), &a.ref_).cmp(&(&b.project.name, b.kind.as_str(), &b.ref_))
    });

    let mut projects: Vec<&str> = sorted.iter().map(|r| r.project.name.as_str()).collect();
    projects.dedup();

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        muted("Projects:"),
        highlight(projects.len()),
        muted("Refs tracked:"),
        highlight(sorted.len()),
        muted("Branches:"),
        highlight(count_kind(&sorted, ProjectRefKind::Branch)),
        muted("Tags:"),
        highlight(count_kind(&sorted, ProjectRefKind::Tag)),
        muted("Merge requests:"),
        highlight(count_kind(&sorted, ProjectRefKind::MergeRequest)),
    );

    if sorted.is_empty() {
        let _ = writeln!(output, "  {}", muted("No refs matched the configured rules."));
        return output;
    }

    add_section_header(&mut output, "🌿", "Refs");
    let mut table = create_table();
    table.set_header(cyan_header(&["Project", "Kind", "Ref", "Jobs", "Latest job"]));
    for project_ref in &sorted {
        let latest = latest_job_status(project_ref)
            .map_or_else(|| Cell::new("-"), job_status_cell);
        table.add_row(vec![
            Cell::new(project_name(&project_ref.project.name)),
            kind_cell(project_ref.kind),
            Cell::new(&project_ref.ref_),
            Cell::new(project_ref.jobs.len()),
            latest,
        ]);
    }
    let _ = writeln!(output, "{table}");

    output
}

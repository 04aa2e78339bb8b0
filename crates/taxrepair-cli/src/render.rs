//! Plain-text rendering of audit reports and repair outcomes.

use std::fmt::Write;
use taxrepair_core::{AuditReport, AuditSummary, CommandOutcome, DuplicateGroup, TermTaxonomy};

pub fn render_outcome(outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Audited { summary, report } => render_report(summary, report),
        CommandOutcome::TermDeleted { term_id } => format!("Deleted orphan term {}\n", term_id),
        CommandOutcome::GhostsDeleted { deleted } => {
            format!("Deleted {} ghost relationship(s)\n", deleted)
        }
        CommandOutcome::CountFixed {
            term_taxonomy_id,
            old,
            new,
        } => format!(
            "Count for term taxonomy {}: {} -> {}\n",
            term_taxonomy_id, old, new
        ),
        CommandOutcome::NotFound { entity, id } => {
            format!("Nothing to do: {} {} no longer exists\n", entity, id)
        }
    }
}

fn render_report(summary: &AuditSummary, report: &AuditReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, summary, report);
    out
}

fn write_report(
    out: &mut String,
    summary: &AuditSummary,
    report: &AuditReport,
) -> std::fmt::Result {
    writeln!(out, "Taxonomy audit ({})", report.generated_at.to_rfc3339())?;
    writeln!(out)?;
    writeln!(out, "Summary")?;
    for (label, count) in [
        ("Orphan terms", summary.orphan_terms),
        ("Orphan term taxonomy rows", summary.orphan_term_taxonomies),
        ("Ghost relationships", summary.ghost_relationships),
        ("Incorrect counts", summary.incorrect_counts),
        ("Broken parent chains", summary.broken_parents),
        ("Terms in unregistered taxonomies", summary.unregistered_taxonomies),
        ("Duplicate names", summary.duplicate_names),
        ("Duplicate slugs", summary.duplicate_slugs),
    ] {
        writeln!(out, "  {:<34}{:>6}", label, count)?;
    }

    section(out, "Orphaned terms", report.orphan_terms.is_empty())?;
    for t in &report.orphan_terms {
        writeln!(out, "  term {:<8} {:<30} {}", t.term_id, t.name, t.slug)?;
    }
    if !report.orphan_terms.is_empty() {
        writeln!(out, "  Repair: taxrepair delete-orphan-term <TERM_ID>")?;
    }

    section(
        out,
        "Orphaned term taxonomy rows",
        report.orphan_term_taxonomies.is_empty(),
    )?;
    write_term_taxonomies(out, &report.orphan_term_taxonomies)?;
    if !report.orphan_term_taxonomies.is_empty() {
        writeln!(
            out,
            "  Manual review: confirm no plugin uses these rows before deleting them."
        )?;
    }

    section(
        out,
        "Ghost relationships",
        report.ghost_relationships.is_empty(),
    )?;
    for rel in &report.ghost_relationships {
        writeln!(
            out,
            "  object {:<8} -> missing term taxonomy {}",
            rel.object_id, rel.term_taxonomy_id
        )?;
    }
    if !report.ghost_relationships.is_empty() {
        writeln!(out, "  Repair: taxrepair delete-ghost-relationships")?;
    }

    section(out, "Incorrect term counts", report.incorrect_counts.is_empty())?;
    for entry in &report.incorrect_counts {
        writeln!(
            out,
            "  tt {:<8} {:<20} stored {:<6} real {}",
            entry.term_taxonomy.term_taxonomy_id,
            entry.term_taxonomy.taxonomy,
            entry.stored,
            entry.real
        )?;
    }
    if !report.incorrect_counts.is_empty() {
        writeln!(out, "  Repair: taxrepair fix-count <TERM_TAXONOMY_ID>")?;
    }

    section(out, "Broken parent chains", report.broken_parents.is_empty())?;
    for tt in &report.broken_parents {
        writeln!(
            out,
            "  tt {:<8} term {:<8} parent {:<8} {}",
            tt.term_taxonomy_id, tt.term_id, tt.parent, tt.taxonomy
        )?;
    }
    if !report.broken_parents.is_empty() {
        writeln!(
            out,
            "  Manual review: reassign or flatten these terms; only you know the hierarchy."
        )?;
    }

    section(
        out,
        "Terms in unregistered taxonomies",
        report.unregistered_taxonomies.is_empty(),
    )?;
    write_term_taxonomies(out, &report.unregistered_taxonomies)?;
    if !report.unregistered_taxonomies.is_empty() {
        writeln!(
            out,
            "  Manual review: usually left behind by removed plugins. Investigate before removal."
        )?;
    }

    section(out, "Duplicate names", report.duplicate_names.is_empty())?;
    write_duplicates(out, &report.duplicate_names)?;
    section(out, "Duplicate slugs", report.duplicate_slugs.is_empty())?;
    write_duplicates(out, &report.duplicate_slugs)?;
    if !report.duplicate_slugs.is_empty() {
        writeln!(out, "  Manual review: changing slugs changes URLs.")?;
    }

    Ok(())
}

fn section(out: &mut String, title: &str, empty: bool) -> std::fmt::Result {
    writeln!(out)?;
    if empty {
        writeln!(out, "{}: none", title)
    } else {
        writeln!(out, "{}", title)
    }
}

fn write_term_taxonomies(out: &mut String, rows: &[TermTaxonomy]) -> std::fmt::Result {
    for tt in rows {
        writeln!(
            out,
            "  tt {:<8} term {:<8} {}",
            tt.term_taxonomy_id, tt.term_id, tt.taxonomy
        )?;
    }
    Ok(())
}

fn write_duplicates(out: &mut String, groups: &[DuplicateGroup]) -> std::fmt::Result {
    for group in groups {
        let ids: Vec<String> = group.term_ids().iter().map(|id| id.to_string()).collect();
        writeln!(out, "  {:<30} terms {}", group.key, ids.join(", "))?;
    }
    Ok(())
}

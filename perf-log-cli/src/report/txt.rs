//! Plain text report with aligned tables

use super::{EventRow, ExtremeCell, HeaderSection, Report, StatisticsRow};
use perf_log_decoder::format_perf_id;
use std::fmt::Write;

const RULE: &str = "═══════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────";

const STAT_COLUMNS: [&str; 15] = [
    "Name",
    "ID",
    "Entries",
    "Exits",
    "Avg Freq (Hz)",
    "Active (s)",
    "Active %",
    "Inactive (s)",
    "Inactive %",
    "Min Active",
    "Max Active",
    "Min Interval",
    "Max Interval",
    "Min Overrun",
    "Max Overrun",
];

/// Render the whole report as text
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    let p = report.time_precision;

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  Performance Log Statistics");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Generated: {} (v{})", report.generated, report.tool_version);
    let _ = writeln!(out);

    render_load(&mut out, report);

    for header in &report.headers {
        render_header(&mut out, header);
    }

    let _ = writeln!(out, "Statistics");
    let _ = writeln!(out, "{}", THIN_RULE);
    let rows: Vec<Vec<String>> = report
        .statistics
        .iter()
        .chain(std::iter::once(&report.overall))
        .map(|row| statistics_cells(row, p))
        .collect();
    render_table(&mut out, &STAT_COLUMNS, &rows);

    if !report.events.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Events");
        let _ = writeln!(out, "{}", THIN_RULE);
        let rows: Vec<Vec<String>> = report.events.iter().map(|e| event_cells(e, p)).collect();
        render_table(
            &mut out,
            &["#", "Time (s)", "ID", "Name", "Type", "Flags", "Overrun (s)", "Notes"],
            &rows,
        );
    }

    out
}

fn render_load(out: &mut String, report: &Report) {
    let load = &report.load;

    let _ = writeln!(out, "Files loaded:        {}", load.files_loaded);
    for failure in &load.failures {
        let _ = writeln!(out, "  skipped: {}", failure);
    }
    for failure in &load.notes_failures {
        let _ = writeln!(out, "  notes ignored: {}", failure);
    }
    let _ = writeln!(out, "Events:              {}", load.event_count);
    let _ = writeln!(out, "IDs in log:          {}", load.distinct_ids);
    if load.excluded_events > 0 {
        let _ = writeln!(
            out,
            "Events beyond IDs:   {} (capacity {} IDs)",
            load.excluded_events, load.maximum_ids
        );
    }
    let _ = writeln!(
        out,
        "Data gaps:           {} ({})",
        load.gaps,
        if load.gaps_shown { "shown" } else { "hidden" }
    );
    let _ = writeln!(
        out,
        "Time span:           {:.*} s (gaps removed)",
        report.time_precision, load.adjusted_time_span
    );
    if load.backward_jumps > 0 || load.consecutive_events > 0 {
        let _ = writeln!(
            out,
            "Inconsistencies:     {} backward time jumps, {} consecutive events",
            load.backward_jumps, load.consecutive_events
        );
    }
    if let Some(ids) = &load.id_file {
        let _ = writeln!(
            out,
            "ID file:             {} IDs, {} added, {} beyond capacity",
            ids.total, ids.added, ids.exceeding_capacity
        );
    }
    let _ = writeln!(out);
}

fn render_header(out: &mut String, header: &HeaderSection) {
    let _ = writeln!(out, "Log file: {}", header.file_name);
    let _ = writeln!(out, "{}", THIN_RULE);
    let fields: [(&str, String); 16] = [
        ("Description", header.description.clone()),
        ("Capture time", header.capture_time.clone()),
        ("Spacecraft ID", header.spacecraft_id.to_string()),
        ("Processor ID", header.processor_id.to_string()),
        ("Application ID", header.application_id.to_string()),
        ("Version", header.version.to_string()),
        ("Endianness", header.endianness.clone()),
        ("Ticks/second", header.ticks_per_second.to_string()),
        ("Timer rollover", header.timer_rollover.to_string()),
        ("Trigger state", header.trigger_state.clone()),
        ("Trigger mode", header.trigger_mode.clone()),
        ("Trigger count", header.trigger_count.to_string()),
        (
            "Data start/end/count",
            format!("{}/{}/{}", header.data_start, header.data_end, header.data_count),
        ),
        ("Invalid markers", header.invalid_marker_count.to_string()),
        ("Filter mask", header.filter_mask.clone()),
        ("Trigger mask", header.trigger_mask.clone()),
    ];
    for (label, value) in fields {
        let _ = writeln!(out, "  {:<22} {}", label, value);
    }
    let _ = writeln!(out);
}

fn statistics_cells(row: &StatisticsRow, p: usize) -> Vec<String> {
    vec![
        row.name.clone(),
        row.id.clone().unwrap_or_default(),
        row.entries.to_string(),
        row.exits.to_string(),
        format!("{:.3}", row.avg_frequency),
        format!("{:.*}", p, row.time_active),
        format!("{:.2}", row.percent_active),
        format!("{:.*}", p, row.time_inactive),
        format!("{:.2}", row.percent_inactive),
        extreme(row.min_active, p),
        extreme(row.max_active, p),
        extreme(row.min_interval, p),
        extreme(row.max_interval, p),
        extreme(row.min_overrun, p),
        extreme(row.max_overrun, p),
    ]
}

fn extreme(cell: Option<ExtremeCell>, p: usize) -> String {
    match cell {
        None => "n/a".to_string(),
        Some(c) => match c.id {
            Some(id) => format!("{:.*} @ {:.*} [{}]", p, c.value, p, c.time_stamp, format_perf_id(id)),
            None => format!("{:.*} @ {:.*}", p, c.value, p, c.time_stamp),
        },
    }
}

fn event_cells(event: &EventRow, p: usize) -> Vec<String> {
    vec![
        event.index.to_string(),
        format!("{:.*}", p, event.time_stamp),
        event.id.clone(),
        event.name.clone(),
        event.kind.to_string(),
        if event.sequence_error { "SEQ".to_string() } else { String::new() },
        if event.overrun > 0.0 {
            format!("{:.*}", p, event.overrun)
        } else {
            String::new()
        },
        event.notes.clone(),
    ]
}

fn render_table(out: &mut String, columns: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let _ = writeln!(out, "{}", padded_line(columns, &widths));
    let _ = writeln!(
        out,
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    );
    for row in rows {
        let _ = writeln!(out, "{}", padded_line(row, &widths));
    }
}

fn padded_line<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use colmap_cli::commands::{Detection, LearnOutcome};
use colmap_model::{
    CorrectionFrequency, Feedback, FeedbackPattern, FeedbackStats, PatternSeverity, Trend,
};
use colmap_standards::SchemaType;

pub fn print_detection(detection: Option<&Detection>) {
    let Some(detection) = detection else {
        println!("No fast-path format detected; full analysis needed.");
        return;
    };
    let table = &detection.table;
    println!(
        "Format: {} (confidence {:.2})",
        table.format.as_str(),
        table.confidence
    );
    println!(
        "Header row: {} (confidence {}/100)",
        detection.header.index + 1,
        detection.header.confidence
    );
    let headers = table
        .rows
        .get(detection.header.index)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let mut out = Table::new();
    out.set_header(vec![header_cell("#"), header_cell("Column")]);
    apply_table_style(&mut out);
    align_column(&mut out, 0, CellAlignment::Right);
    for (idx, header) in headers.iter().enumerate() {
        out.add_row(vec![Cell::new(idx), Cell::new(header)]);
    }
    println!("{out}");
    let data_rows = table.rows.len().saturating_sub(detection.header.index + 1);
    println!("{data_rows} data row(s)");
}

pub fn print_schemas() {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Schema"), header_cell("Required fields")]);
    apply_table_style(&mut table);
    for schema in SchemaType::ALL {
        let fields = schema.required_fields();
        let fields_cell = if fields.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(fields.join(", "))
        };
        table.add_row(vec![
            Cell::new(schema.as_str()).add_attribute(Attribute::Bold),
            fields_cell,
        ]);
    }
    println!("{table}");
}

pub fn print_submitted(feedback: &Feedback) {
    println!("Recorded feedback {}", feedback.id);
    println!(
        "Request: {}  rating: {}  fixes: {}",
        feedback.request_hash,
        feedback.rating.value(),
        feedback.column_fixes.len()
    );
}

pub fn print_stats(stats: &FeedbackStats) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Metric"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Total"), Cell::new(stats.total_count)]);
    table.add_row(vec![
        Cell::new("Positive"),
        Cell::new(stats.positive_count).fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Negative"),
        Cell::new(stats.negative_count).fg(Color::Red),
    ]);
    table.add_row(vec![
        Cell::new("Positive rate"),
        Cell::new(format!("{:.0}%", stats.positive_rate * 100.0)),
    ]);
    table.add_row(vec![Cell::new("Trend"), trend_cell(stats.recent_trend)]);
    println!("{table}");
}

pub fn print_patterns(patterns: &[FeedbackPattern], days: i64) {
    if patterns.is_empty() {
        println!("No patterns in the last {days} day(s).");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Pattern"),
        header_cell("Count"),
        header_cell("Request"),
        header_cell("Suggestion"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for pattern in patterns {
        let request = if pattern.request_hash.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(&pattern.request_hash)
        };
        table.add_row(vec![
            severity_cell(pattern.severity),
            Cell::new(pattern.kind.as_str()),
            Cell::new(pattern.frequency),
            request,
            Cell::new(&pattern.suggestion),
        ]);
    }
    println!("{table}");
}

pub fn print_corrections(corrections: &[CorrectionFrequency]) {
    if corrections.is_empty() {
        println!("No column corrections recorded.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source header"),
        header_cell("Mapped to"),
        header_cell("Corrected to"),
        header_cell("Count"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for correction in corrections {
        let wrong = if correction.wrong_mapping.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(&correction.wrong_mapping).fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&correction.source_header),
            wrong,
            Cell::new(&correction.correct_mapping).fg(Color::Green),
            Cell::new(correction.frequency),
        ]);
    }
    println!("{table}");
}

pub fn print_learning(outcome: &LearnOutcome) {
    let report = &outcome.report;
    println!(
        "Patterns: {}  corrections: {}  examples: {}",
        report.patterns_found, report.corrections_found, report.examples_generated
    );
    if report.examples_failed > 0 {
        println!("Failed to store {} example(s).", report.examples_failed);
    }
    for line in &report.improvements {
        println!("  {line}");
    }
    match &outcome.examples_dir {
        Some(dir) => println!("Examples written to {}", dir.display()),
        None if report.examples_generated > 0 => {
            println!("No examples directory configured; examples were not persisted.");
        }
        None => {}
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn severity_cell(severity: PatternSeverity) -> Cell {
    match severity {
        PatternSeverity::High => Cell::new("HIGH")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        PatternSeverity::Medium => Cell::new("MEDIUM").fg(Color::Yellow),
    }
}

fn trend_cell(trend: Trend) -> Cell {
    let color = match trend {
        Trend::Improving => Color::Green,
        Trend::Declining => Color::Red,
        Trend::Stable => Color::DarkGrey,
    };
    Cell::new(trend.as_str()).fg(color)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

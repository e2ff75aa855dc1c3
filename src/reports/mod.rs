use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use lineforge::api::{BalanceReport, RankedLine};
use lineforge::graph::TaskGraph;
use lineforge::metrics::LineMetrics;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn align_right(table: &mut Table, columns: std::ops::RangeInclusive<usize>) {
    for i in columns {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

pub fn print_station_table(line: &RankedLine, cycle_time: f64) {
    println!("\nLine #{}", line.rank);
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Station").add_attribute(Attribute::Bold),
        Cell::new("Tasks"),
        Cell::new("Time").fg(Color::Cyan),
        Cell::new("Idle"),
    ]);

    for (k, (station, time)) in line
        .stations
        .iter()
        .zip(&line.metrics.station_times)
        .enumerate()
    {
        let tasks = station
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let idle = cycle_time - time;
        let idle_cell = if idle <= 0.0 {
            Cell::new(format!("{:.2}", idle)).fg(Color::Green)
        } else {
            Cell::new(format!("{:.2}", idle))
        };
        table.add_row(vec![
            Cell::new(k + 1).add_attribute(Attribute::Bold),
            Cell::new(tasks),
            Cell::new(format!("{:.2}", time)).fg(Color::Cyan),
            idle_cell,
        ]);
    }
    align_right(&mut table, 2..=3);
    println!("{}", table);
}

pub fn print_metrics_table(results: &[(String, &LineMetrics)]) {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Line").add_attribute(Attribute::Bold),
        Cell::new("Stations").fg(Color::Cyan),
        Cell::new("Cycle"),
        Cell::new("Work"),
        Cell::new("Eff %").fg(Color::Green),
        Cell::new("SI"),
        Cell::new("Loss %").fg(Color::Red),
        Cell::new("Util %"),
    ]);

    for (name, m) in results {
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(m.stations).fg(Color::Cyan),
            Cell::new(format!("{:.2}", m.cycle_time)),
            Cell::new(format!("{:.2}", m.total_work_time)),
            Cell::new(format!("{:.2}", m.line_efficiency)).fg(Color::Green),
            Cell::new(format!("{:.4}", m.smoothness_index)),
            Cell::new(format!("{:.2}", m.loss_of_balance)).fg(Color::Red),
            Cell::new(format!("{:.2}", m.utilization)),
        ]);
    }
    align_right(&mut table, 1..=7);
    println!("\n{}", table);
}

pub fn print_side_labels(line: &RankedLine) {
    let Some(sides) = &line.sides else {
        return;
    };
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Task").add_attribute(Attribute::Bold),
        Cell::new("Side"),
    ]);
    for (task, label) in sides {
        table.add_row(vec![Cell::new(task), Cell::new(label.to_string())]);
    }
    println!("\n{}", table);
}

/// Station tables for every ranked line, then one metrics table.
pub fn print_report(report: &BalanceReport) {
    println!(
        "\n📋 {} ({}) at cycle time {:.2}, {} result(s)",
        report.method,
        report.layout,
        report.cycle_time,
        report.results.len()
    );
    for line in &report.results {
        print_station_table(line, report.cycle_time);
        print_side_labels(line);
    }
    let rows: Vec<(String, &LineMetrics)> = report
        .results
        .iter()
        .map(|line| (format!("#{}", line.rank), &line.metrics))
        .collect();
    print_metrics_table(&rows);
}

pub fn print_task_table(graph: &TaskGraph) {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Task").add_attribute(Attribute::Bold),
        Cell::new("Predecessors"),
        Cell::new("Duration").fg(Color::Cyan),
        Cell::new("RPW"),
        Cell::new("Reverse RPW"),
        Cell::new("Region"),
    ]);

    for id in graph.ids() {
        let preds = graph
            .predecessors(id)
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let region = graph
            .region_of(id)
            .map(|r| {
                if r.is_pivot() {
                    format!("{} (pivot)", r.index)
                } else {
                    r.index.to_string()
                }
            })
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(id).add_attribute(Attribute::Bold),
            Cell::new(preds),
            Cell::new(format!("{:.2}", graph.duration(id).unwrap_or(0.0))).fg(Color::Cyan),
            Cell::new(format!("{:.2}", graph.ranked_positional_weight(id).unwrap_or(0.0))),
            Cell::new(format!("{:.2}", graph.reverse_positional_weight(id).unwrap_or(0.0))),
            Cell::new(region),
        ]);
    }
    align_right(&mut table, 2..=4);
    println!("\n{}", table);
}

pub fn print_regions(graph: &TaskGraph) {
    let cut = graph.articulation_points();
    println!(
        "\n✂️  Articulation points: {}",
        if cut.is_empty() {
            "none".to_string()
        } else {
            cut.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
        }
    );

    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Region").add_attribute(Attribute::Bold),
        Cell::new("Positions"),
        Cell::new("Tasks"),
    ]);
    for region in graph.regions() {
        let window = region.window();
        table.add_row(vec![
            Cell::new(region.index).add_attribute(Attribute::Bold),
            Cell::new(format!("{}..{}", window.start, window.end)),
            Cell::new(
                region
                    .tasks
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]);
    }
    println!("{}", table);
}

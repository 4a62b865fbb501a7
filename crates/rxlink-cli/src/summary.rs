use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use rxlink_match::Variations;
use rxlink_model::{
    ConfidenceBand, LinkMethod, LinkedMedicine, LinkingReport, MatchResult, MatchStatus,
    MedicineRecord,
};
use rxlink_store::{CatalogMeta, LoadedCatalog};

pub fn print_match(name: &str, result: &MatchResult) {
    println!("Query: {name}");
    println!("{}", status_line(result));
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Role"),
        header_cell("Id"),
        header_cell("Name"),
        header_cell("Composition"),
        header_cell("Confidence"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);

    let mut rows = 0;
    if let Some(record) = &result.matched {
        table.add_row(record_row("match", record, Some(result.confidence)));
        rows += 1;
    }
    if let Some(record) = &result.suggestion {
        table.add_row(record_row("suggestion", record, Some(result.confidence)));
        rows += 1;
    }
    for alternative in &result.alternatives {
        table.add_row(vec![
            dim_cell("alternative"),
            Cell::new(alternative.id),
            Cell::new(&alternative.name),
            dim_cell("-"),
            confidence_cell(Some(alternative.confidence)),
        ]);
        rows += 1;
    }
    if rows > 0 {
        println!("{table}");
    }
    if let Some(term) = &result.search_term_used {
        println!("Search term: {term}");
    }
}

pub fn print_link_report(report: &LinkingReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Input"),
        header_cell("Method"),
        header_cell("Id"),
        header_cell("Catalog name"),
        header_cell("Salt"),
        header_cell("Confidence"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 6, CellAlignment::Right);
    for medicine in &report.medicines {
        table.add_row(vec![
            Cell::new(medicine.index + 1),
            Cell::new(&medicine.input.name),
            method_cell(medicine.method),
            medicine
                .medicine_id
                .map_or_else(|| dim_cell("-"), Cell::new),
            catalog_name_cell(medicine),
            medicine
                .display_salt()
                .map_or_else(|| dim_cell("-"), Cell::new),
            confidence_cell(medicine.confidence),
        ]);
    }
    println!("{table}");

    let stats = &report.statistics;
    let mut totals = Table::new();
    totals.set_header(vec![
        header_cell("Total"),
        header_cell("Manual"),
        header_cell("Exact"),
        header_cell("Fuzzy"),
        header_cell("Composition"),
        header_cell("Failed"),
        header_cell("Not linked"),
        header_cell("Rate"),
    ]);
    apply_table_style(&mut totals);
    totals.add_row(vec![
        Cell::new(stats.total).add_attribute(Attribute::Bold),
        Cell::new(stats.manual),
        Cell::new(stats.exact),
        Cell::new(stats.fuzzy),
        Cell::new(stats.composition),
        count_cell(stats.failed, Color::Red),
        count_cell(stats.not_linked, Color::Yellow),
        Cell::new(format!("{:.1}%", stats.linking_rate() * 100.0)).add_attribute(Attribute::Bold),
    ]);
    println!("{totals}");
    println!(
        "Confidence: {} high, {} medium, {} low",
        stats.high_confidence, stats.medium_confidence, stats.low_confidence
    );
}

pub fn print_variations(name: &str, variations: &Variations) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Variation")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (position, variant) in variations.iter().enumerate() {
        let cell = if variant == name {
            Cell::new(variant).add_attribute(Attribute::Bold)
        } else {
            Cell::new(variant)
        };
        table.add_row(vec![Cell::new(position + 1), cell]);
    }
    println!("{table}");
}

pub fn print_catalog_info(path: &str, active: usize, version: i64, meta: Option<&CatalogMeta>) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.add_row(vec![header_cell("Catalog"), Cell::new(path)]);
    table.add_row(vec![header_cell("Schema version"), Cell::new(version)]);
    table.add_row(vec![header_cell("Active records"), Cell::new(active)]);
    match meta {
        Some(meta) => {
            table.add_row(vec![header_cell("Imported from"), Cell::new(&meta.source_path)]);
            table.add_row(vec![header_cell("Imported at"), Cell::new(&meta.imported_at)]);
            table.add_row(vec![header_cell("Records imported"), Cell::new(meta.record_count)]);
            table.add_row(vec![header_cell("SHA-256"), Cell::new(&meta.source_sha256)]);
        }
        None => {
            table.add_row(vec![header_cell("Imported from"), dim_cell("never imported")]);
        }
    }
    println!("{table}");
}

pub fn print_csv_info(catalog: &LoadedCatalog) {
    let active = catalog.records.iter().filter(|r| r.active).count();
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.add_row(vec![
        header_cell("Catalog"),
        Cell::new(catalog.path.display()),
    ]);
    table.add_row(vec![header_cell("Format"), dim_cell("CSV, loaded in memory")]);
    table.add_row(vec![header_cell("Records"), Cell::new(catalog.records.len())]);
    table.add_row(vec![header_cell("Active records"), Cell::new(active)]);
    table.add_row(vec![header_cell("SHA-256"), Cell::new(&catalog.sha256)]);
    println!("{table}");
}

fn status_line(result: &MatchResult) -> String {
    match result.status {
        MatchStatus::Matched => format!("{} ({:.2})", result.message, result.confidence),
        _ => result.message.clone(),
    }
}

fn record_row(role: &str, record: &MedicineRecord, confidence: Option<f64>) -> Vec<Cell> {
    vec![
        Cell::new(role).add_attribute(Attribute::Bold),
        Cell::new(record.id),
        Cell::new(&record.brand_name),
        record
            .composition_summary()
            .map_or_else(|| dim_cell("-"), Cell::new),
        confidence_cell(confidence),
    ]
}

fn catalog_name_cell(medicine: &LinkedMedicine) -> Cell {
    match (&medicine.record, &medicine.suggestion) {
        (Some(record), _) => Cell::new(&record.brand_name),
        (None, Some(suggestion)) => dim_cell(format!("{}?", suggestion.brand_name)),
        (None, None) => dim_cell("-"),
    }
}

fn method_cell(method: LinkMethod) -> Cell {
    let cell = Cell::new(method);
    match method {
        LinkMethod::Manual | LinkMethod::Exact => cell.fg(Color::Green),
        LinkMethod::Fuzzy | LinkMethod::Composition => cell.fg(Color::Cyan),
        LinkMethod::Failed => cell.fg(Color::Red),
        LinkMethod::NotLinked => cell.fg(Color::DarkGrey),
    }
}

fn confidence_cell(confidence: Option<f64>) -> Cell {
    let Some(value) = confidence else {
        return dim_cell("-");
    };
    let color = match ConfidenceBand::from_confidence(value) {
        ConfidenceBand::High => Color::Green,
        ConfidenceBand::Medium => Color::Yellow,
        ConfidenceBand::Low => Color::Red,
    };
    Cell::new(format!("{value:.2}")).fg(color)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count).fg(color)
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

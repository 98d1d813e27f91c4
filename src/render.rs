//! Terminal tables for command output.

use analytics::{AnalysisReport, Ranked};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use database::RelationCount;
use pipeline::{IngestReport, SummaryReport};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// `$1.23M`, `$4.56K` or `$7.89`.
pub fn format_dollars(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1_000_000.0 {
        format!("${:.2}M", value / 1_000_000.0)
    } else if magnitude >= 1_000.0 {
        format!("${:.2}K", value / 1_000.0)
    } else {
        format!("${value:.2}")
    }
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn ingest_table(report: &IngestReport) -> Table {
    let mut t = table(vec!["Relation", "Rows"]);
    for load in &report.relations {
        t.add_row(vec![load.relation.to_string(), load.rows.to_string()]);
    }
    t
}

pub fn summary_table(report: &SummaryReport) -> Table {
    let stats = &report.enrichment;
    let mut t = table(vec!["Run", "Rows published", "Non-numeric volumes", "Undefined margins", "Elapsed"]);
    t.add_row(vec![
        report.run_id.to_string(),
        report.rows.to_string(),
        stats.unparsable_volumes.to_string(),
        stats.undefined_margins.to_string(),
        format!("{} ms", report.elapsed_ms),
    ]);
    t
}

pub fn relation_table(counts: &[RelationCount]) -> Table {
    let mut t = table(vec!["Relation", "Rows"]);
    for count in counts {
        t.add_row(vec![count.name.clone(), count.rows.to_string()]);
    }
    t
}

fn ranking_table(label: &str, value_label: &str, ranked: &[Ranked], dollars: bool) -> Table {
    let mut t = table(vec![label, value_label]);
    for entry in ranked {
        let value = if dollars {
            format_dollars(entry.value)
        } else {
            format!("{:.4}", entry.value)
        };
        t.add_row(vec![entry.name.clone(), value]);
    }
    t
}

pub fn print_analysis(report: &AnalysisReport) {
    println!("Rows analysed: {}\n", report.rows);

    let mut describe = table(vec!["Column", "Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max"]);
    for c in &report.describe {
        describe.add_row(vec![
            c.column.clone(),
            c.count.to_string(),
            number(c.mean),
            number(c.std),
            number(c.min),
            number(c.q25),
            number(c.median),
            number(c.q75),
            number(c.max),
        ]);
    }
    println!("Summary statistics\n{describe}\n");

    let mut header = vec![""];
    header.extend(report.correlations.columns.iter().map(String::as_str));
    let mut correlations = table(header);
    for (name, row) in report.correlations.columns.iter().zip(&report.correlations.values) {
        let mut cells = vec![name.clone()];
        cells.extend(row.iter().map(|v| number(*v)));
        correlations.add_row(cells);
    }
    println!("Correlations\n{correlations}\n");

    println!(
        "Top vendors by sales\n{}\n",
        ranking_table("Vendor", "Sales", &report.top_vendors, true)
    );
    println!(
        "Top brands by sales\n{}\n",
        ranking_table("Brand", "Sales", &report.top_brands, true)
    );

    let pc = &report.purchase_contribution;
    let mut contribution = table(vec!["Vendor", "Purchases", "Gross profit", "Sales", "Share %", "Cumulative %"]);
    for v in &pc.vendors {
        contribution.add_row(vec![
            v.vendor_name.clone(),
            format_dollars(v.total_purchase_dollars),
            format_dollars(v.gross_profit),
            format_dollars(v.total_sales_dollars),
            format!("{:.2}", v.contribution_pct),
            format!("{:.2}", v.cumulative_pct),
        ]);
    }
    println!(
        "Purchase contribution (top vendors hold {:.2}% of procurement)\n{contribution}\n",
        pc.top_share_pct
    );

    let mut order_size = table(vec!["Order size", "Up to quantity", "Rows", "Mean unit price"]);
    for b in &report.order_size_unit_price {
        order_size.add_row(vec![
            format!("{:?}", b.size),
            number(b.upper_bound),
            b.rows.to_string(),
            b.mean_unit_price.map_or_else(|| "-".to_string(), format_dollars),
        ]);
    }
    println!("Unit price by order size\n{order_size}\n");

    println!(
        "Vendors with low stock turnover\n{}\n",
        ranking_table("Vendor", "Mean turnover", &report.low_turnover_vendors, false)
    );
    println!(
        "Unsold inventory: {} in total\n{}\n",
        format_dollars(report.unsold_inventory.total_value),
        ranking_table("Vendor", "Unsold value", &report.unsold_inventory.top_vendors, true)
    );

    let promo = &report.promotion_candidates;
    let mut candidates = table(vec!["Brand", "Sales", "Mean margin %"]);
    for b in &promo.brands {
        candidates.add_row(vec![
            b.description.clone(),
            format_dollars(b.total_sales_dollars),
            format!("{:.2}", b.mean_profit_margin),
        ]);
    }
    println!(
        "Low-sales, high-margin brands (sales <= {}, margin >= {})\n{candidates}\n",
        number(promo.low_sales_threshold),
        number(promo.high_margin_threshold)
    );

    let mc = &report.margin_comparison;
    let mut margins = table(vec!["Group", "Rows", "Mean margin %", "CI lower", "CI upper"]);
    for (label, count, ci) in [("Top", mc.top_count, mc.top), ("Low", mc.low_count, mc.low)] {
        margins.add_row(vec![
            label.to_string(),
            count.to_string(),
            number(ci.map(|c| c.mean)),
            number(ci.map(|c| c.lower)),
            number(ci.map(|c| c.upper)),
        ]);
    }
    println!("Profit margin, top vs low sellers\n{margins}");
    match (mc.test, mc.significant) {
        (Some(test), Some(significant)) => println!(
            "Welch t = {:.4}, df = {:.2}, p = {:.4}: {} at alpha = {}",
            test.t_statistic,
            test.degrees_of_freedom,
            test.p_value,
            if significant {
                "margins differ significantly"
            } else {
                "no significant difference"
            },
            mc.alpha
        ),
        _ => println!("Not enough data for a t-test."),
    }
}

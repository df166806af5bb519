//! Series command implementation.

use ampere::store::SeriesId;

/// List the known series and their tables.
pub(crate) fn list_series() {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Available Series                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    for series in SeriesId::ALL {
        let schema = series.schema();
        println!("{}:", series);
        println!("{}", "-".repeat(60));
        println!("  table:   {}", schema.table);
        println!("  columns: {}", schema.column_list());
        println!();
    }
}

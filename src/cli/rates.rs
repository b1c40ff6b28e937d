use super::ui::{self, StyleType, Theme};
use crate::core::RateTable;
use crate::core::convert::flag_url;
use crate::store::RateStore;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Table};

/// Codes to list: all of them, or the requested ones in request order.
/// Requested codes missing from the table are kept so they show as N/A.
pub fn select_codes(table: &RateTable, filter: &[String]) -> Vec<String> {
    if filter.is_empty() {
        return table.currencies().map(str::to_string).collect();
    }
    filter.iter().map(|c| c.to_uppercase()).collect()
}

pub fn rates_table(table: &RateTable, codes: &[String], flags_base_url: &str, theme: Theme) -> Table {
    let mut out = ui::new_styled_table();
    out.set_header(vec![
        ui::header_cell("Currency", theme),
        ui::header_cell(&format!("Rate (per 1 {})", table.base), theme),
        ui::header_cell("Flag", theme),
    ]);

    for code in codes {
        out.add_row(vec![
            Cell::new(code),
            ui::format_optional_cell(table.get(code), |r| format!("{r:.4}")),
            Cell::new(flag_url(flags_base_url, code)).set_alignment(CellAlignment::Left),
        ]);
    }
    out
}

pub async fn run(store: &RateStore, filter: &[String], flags_base_url: &str, dark_mode: bool) -> Result<()> {
    let theme = Theme::from_dark_mode(dark_mode);
    let snapshot = match super::fetch_once(store).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("{}", ui::style_text(&e.to_string(), StyleType::Error, theme));
            return Err(e);
        }
    };

    let codes = select_codes(&snapshot.table, filter);
    println!(
        "{}\n",
        ui::style_text(
            &format!("Exchange rates ({} currencies)", snapshot.table.len()),
            StyleType::Title,
            theme
        )
    );
    println!("{}", rates_table(&snapshot.table, &codes, flags_base_url, theme));
    if let Some(updated) = snapshot.last_updated {
        println!(
            "\n{}",
            ui::style_text(
                &format!("Rates as of {}", updated.format("%Y-%m-%d %H:%M UTC")),
                StyleType::Subtle,
                theme
            )
        );
    }
    Ok(())
}

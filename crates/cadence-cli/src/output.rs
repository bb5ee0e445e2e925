use serde::Serialize;

/// Long titles and reasons dominate table width otherwise; JSON output
/// carries the full text for anyone who needs it.
const MAX_CELL: usize = 60;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    print!("{}", render_table(headers, &rows));
}

fn clip(cell: &str) -> String {
    let chars: Vec<char> = cell.chars().collect();
    if chars.len() <= MAX_CELL {
        cell.to_string()
    } else {
        let mut out: String = chars[..MAX_CELL - 1].iter().collect();
        out.push('…');
        out
    }
}

/// Column widths fit the widest clipped cell; two spaces between columns,
/// a dashed rule under the header.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let clipped: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| clip(c)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &clipped {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &widths, headers.iter().map(|h| h.to_string()));
    push_row(&mut out, &widths, widths.iter().map(|&w| "-".repeat(w)));
    for row in &clipped {
        push_row(&mut out, &widths, row.iter().cloned());
    }
    out
}

fn push_row(out: &mut String, widths: &[usize], cells: impl Iterator<Item = String>) {
    let line = cells
        .zip(widths)
        .map(|(cell, &w)| {
            let pad = w.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

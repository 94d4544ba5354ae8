//! Plain-text table rendering for `list`.

use userdir_core::User;

const HEADERS: [&str; 5] = ["ID", "Email", "Name", "Surname", "Age"];

/// Renders users as a left-aligned table framed by separator rows.
///
/// Returns `"No users found."` for an empty slice.
pub fn render_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found.\n".to_string();
    }

    let rows: Vec<[String; 5]> = users
        .iter()
        .map(|user| {
            [
                user.id().to_string(),
                user.email().to_string(),
                user.name().to_string(),
                user.surname().to_string(),
                user.age().to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut out = String::new();
    out.push_str(&separator);
    out.push('\n');
    out.push_str(&format_row(HEADERS.iter().copied(), &widths));
    out.push_str(&separator);
    out.push('\n');
    for row in &rows {
        out.push_str(&format_row(row.iter().map(String::as_str), &widths));
    }
    out.push_str(&separator);
    out.push('\n');
    out
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("{}\n", line.trim_end())
}

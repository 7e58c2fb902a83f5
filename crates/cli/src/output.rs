//! Terminal output formatting for search and list results.
//!
//! Tables get bold headers and dim rules when stdout is a color-capable
//! terminal; `NO_COLOR` and piped output fall back to plain text, so the
//! table stays grep-friendly in pipelines.

use clap::ValueEnum;
use search::SearchResults;
use storage::Document;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SearchFormat {
    Text,
    Json,
    Table,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ListFormat {
    Table,
    Json,
    Simple,
}

const MAX_CELL_WIDTH: usize = 48;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Check if colors should be used (TTY detection)
fn use_colors() -> bool {
    // Respect NO_COLOR standard
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty::is(atty::Stream::Stdout)
}

/// Apply color if TTY, otherwise return plain text
fn color(c: &str, text: &str) -> String {
    if use_colors() {
        format!("{c}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Calculate visible length (excluding ANSI codes)
fn visible_len(s: &str) -> usize {
    let mut in_escape = false;
    let mut len = 0;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape && c == 'm' {
            in_escape = false;
        } else if !in_escape {
            len += 1;
        }
    }
    len
}

/// Right-pad a styled string to a fixed visible width
fn pad_right(s: &str, width: usize) -> String {
    let visible = visible_len(s);
    if visible >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - visible))
    }
}

pub fn print_search_results(results: &SearchResults, format: SearchFormat) -> anyhow::Result<()> {
    match format {
        SearchFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        SearchFormat::Table => {
            let rows: Vec<[String; 4]> = results
                .hits
                .iter()
                .map(|hit| {
                    [
                        hit.document.title.clone(),
                        hit.document.url.clone(),
                        format!("{:.2}", hit.score),
                        hit.document.created_at.to_rfc3339(),
                    ]
                })
                .collect();
            print_table(&["Title", "URL", "Score", "Date"], &rows);
            println!("\n{} of {} results", results.hits.len(), results.metadata.total);
        }
        SearchFormat::Text => {
            println!("Found {} results:\n", results.metadata.total);
            for hit in &results.hits {
                println!("Title: {}", hit.document.title);
                println!("URL: {}", hit.document.url);
                println!("Score: {:.2}", hit.score);
                println!("---");
            }
        }
    }
    Ok(())
}

pub fn print_documents(docs: &[Document], format: ListFormat) -> anyhow::Result<()> {
    match format {
        ListFormat::Json => {
            println!("{}", serde_json::to_string_pretty(docs)?);
        }
        ListFormat::Simple => {
            for doc in docs {
                println!("{}\t{}", doc.url, doc.title);
            }
        }
        ListFormat::Table => {
            let rows: Vec<[String; 4]> = docs
                .iter()
                .map(|doc| {
                    [
                        doc.url.clone(),
                        doc.title.clone(),
                        doc.doc_type.clone(),
                        doc.created_at.to_rfc3339(),
                    ]
                })
                .collect();
            print_table(&["URL", "Title", "Type", "Created"], &rows);
            println!("\n{} documents", docs.len());
        }
    }
    Ok(())
}

/// Padded-column table with bold headers; cells are clipped so one long URL
/// does not wreck the layout. Padding goes through `visible_len`, so styled
/// cells line up with plain ones.
fn print_table<const N: usize>(headers: &[&str; N], rows: &[[String; N]]) {
    let mut widths: [usize; N] = [0; N];
    for (i, header) in headers.iter().enumerate() {
        widths[i] = header.len();
    }
    let clipped: Vec<[String; N]> = rows
        .iter()
        .map(|row| {
            let out: [String; N] = std::array::from_fn(|i| clip(&row[i]));
            for (i, cell) in out.iter().enumerate() {
                widths[i] = widths[i].max(visible_len(cell));
            }
            out
        })
        .collect();

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| pad_right(&color(BOLD, h), widths[i]))
        .collect();
    println!("{}", header_line.join("  "));

    let rule = "-".repeat(widths.iter().sum::<usize>() + 2 * (N - 1));
    println!("{}", color(DIM, &rule));

    for row in &clipped {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| pad_right(cell, widths[i]))
            .collect();
        println!("{}", line.join("  "));
    }
}

fn clip(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        cell.to_string()
    } else {
        let clipped: String = cell.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{clipped}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_leaves_short_cells_alone() {
        assert_eq!(clip("short"), "short");
    }

    #[test]
    fn clip_truncates_long_cells_with_ellipsis() {
        let long = "x".repeat(100);
        let clipped = clip(&long);
        assert_eq!(clipped.chars().count(), MAX_CELL_WIDTH);
        assert!(clipped.ends_with("..."));
    }

    #[test]
    fn visible_len_ignores_ansi_escapes() {
        assert_eq!(visible_len("hello"), 5);
        assert_eq!(visible_len(""), 0);
        assert_eq!(visible_len(&format!("{BOLD}hello{RESET}")), 5);
    }

    #[test]
    fn pad_right_pads_to_visible_width() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        let styled = format!("{BOLD}ab{RESET}");
        assert_eq!(visible_len(&pad_right(&styled, 4)), 4);
    }
}

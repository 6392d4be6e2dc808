use tabled::{settings::Style, Table, Tabled};
use crate::model::ImageMatch;
use crate::storage::{DbStats, Migration};

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Rows")]
    rows: usize,
}

#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "File")]
    file_name: String,
    #[tabled(rename = "Path")]
    image_path: String,
    #[tabled(rename = "Similarity")]
    similarity: String,
}

#[derive(Tabled)]
struct MigrationRow {
    #[tabled(rename = "Version")]
    version: u32,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Tables")]
    tables: usize,
    #[tabled(rename = "Status")]
    status: &'static str,
}

/// Every known migration, marked applied up to `current_version`
pub fn migrations_table(migrations: &[Migration], current_version: u32) -> String {
    let rows: Vec<MigrationRow> = migrations
        .iter()
        .map(|m| MigrationRow {
            version: m.version,
            name: m.name,
            tables: m.tables.len(),
            status: if m.version <= current_version { "applied" } else { "pending" },
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Row counts per table
pub fn stats_table(stats: &DbStats) -> String {
    let rows: Vec<CountRow> = stats
        .tables
        .iter()
        .map(|(table, rows)| CountRow { table: table.to_string(), rows: *rows })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Ranked similarity matches; empty string when there are none
pub fn matches_table(matches: &[ImageMatch]) -> String {
    if matches.is_empty() {
        return String::new();
    }
    let rows: Vec<MatchRow> = matches
        .iter()
        .enumerate()
        .map(|(i, m)| MatchRow {
            rank: i + 1,
            id: m.id,
            file_name: m.file_name.clone(),
            image_path: m.image_path.clone(),
            similarity: format!("{:.4}", m.similarity),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_table_lists_tables() {
        let stats = DbStats { schema_version: 4, tables: vec![("user_details", 3), ("badges", 0)] };
        let rendered = stats_table(&stats);
        assert!(rendered.contains("user_details"));
        assert!(rendered.contains("Rows"));
    }

    #[test]
    fn test_migrations_table_marks_pending() {
        let rendered = migrations_table(crate::storage::migrations::MIGRATIONS, 2);
        assert!(rendered.contains("core_tables"));
        assert_eq!(rendered.matches("applied").count(), 2);
        assert_eq!(rendered.matches("pending").count(), 2);
    }

    #[test]
    fn test_matches_table() {
        assert!(matches_table(&[]).is_empty());
        let m = ImageMatch {
            id: 7,
            file_name: "leaf.png".to_string(),
            image_path: "/img/leaf.png".to_string(),
            distance: 0.25,
            similarity: 0.75,
        };
        let rendered = matches_table(&[m]);
        assert!(rendered.contains("leaf.png"));
        assert!(rendered.contains("0.7500"));
    }
}

//! Column-oriented view of the engine's delimited outputs (TSV and box files).

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Header the engine omits from box files.
pub const BOX_HEADER: &str = "char left bottom right top page";

/// One table cell. Numeric cells are truncated to integers.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Text(String),
}

impl Cell {
    /// Float-then-truncate coercion. Anything that is not a number, or whose
    /// integer part does not fit an `i64`, stays text.
    pub fn coerce(raw: &str) -> Self {
        // 2^63, exactly representable as f64.
        const BOUND: f64 = 9_223_372_036_854_775_808.0;
        match raw.trim().parse::<f64>().map(f64::trunc) {
            Ok(value) if (-BOUND..BOUND).contains(&value) => Cell::Int(value as i64),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(value) => Some(*value),
            Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            Cell::Int(_) => None,
        }
    }
}

/// Header and data rows of a delimited output, or `None` when there is no
/// data row. A short last row gets one empty cell appended: the engine drops
/// the trailing empty field when the last word is empty, and trimming the
/// text removes what is left of it.
fn split_rows<'a>(text: &'a str, delimiter: &str) -> Option<(Vec<&'a str>, Vec<Vec<&'a str>>)> {
    let mut rows: Vec<Vec<&str>> = text
        .trim()
        .split('\n')
        .map(|row| row.split(delimiter).collect())
        .collect();
    if rows.len() < 2 {
        return None;
    }

    let header = rows.remove(0);
    if let Some(last) = rows.last_mut() {
        if last.len() < header.len() {
            last.push("");
        }
    }
    Some((header, rows))
}

/// Complete data rows as `(column, raw cell)` pairs. Unlike [`Table::parse`],
/// rows shorter than the header are dropped whole, so the cells of one
/// record always belong to the same engine row.
pub fn records<'a>(text: &'a str, delimiter: &str) -> Vec<Vec<(&'a str, &'a str)>> {
    let Some((header, rows)) = split_rows(text, delimiter) else {
        return Vec::new();
    };
    rows.into_iter()
        .filter(|row| row.len() >= header.len())
        .map(|row| header.iter().copied().zip(row).collect())
        .collect()
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(value) => write!(f, "{}", value),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

/// Ordered mapping of column name to the column's cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    header: Vec<String>,
    columns: Vec<Vec<Cell>>,
}

impl Table {
    /// Parses delimited text whose first row is the header.
    ///
    /// `string_column` is never coerced to integers; negative values count
    /// from the end of the header. Rows too short for a column are left out
    /// of that column only.
    pub fn parse(text: &str, delimiter: &str, string_column: isize) -> Self {
        let Some((header, rows)) = split_rows(text, delimiter) else {
            return Self::default();
        };
        let width = header.len();

        let string_column = if string_column < 0 {
            string_column + width as isize
        } else {
            string_column
        };

        let columns = (0..width)
            .map(|i| {
                rows.iter()
                    .filter_map(|row| row.get(i))
                    .map(|raw| {
                        if i as isize == string_column {
                            Cell::Text(raw.to_string())
                        } else {
                            Cell::coerce(raw)
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            header: header.into_iter().map(str::to_string).collect(),
            columns,
        }
    }

    /// Parses the engine's TSV output. The last column holds the text.
    pub fn parse_tsv(text: &str) -> Self {
        Self::parse(text, "\t", -1)
    }

    /// Parses a box file, which has no header of its own.
    pub fn parse_boxes(text: &str) -> Self {
        Self::parse(&format!("{}\n{}", BOX_HEADER, text), " ", 0)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.header
            .iter()
            .position(|h| h == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Cell])> {
        self.header
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    /// Number of data rows, counted on the longest column.
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Writes the table back out, header first.
    pub fn to_delimited(&self, delimiter: &str) -> String {
        let mut lines = vec![self.header.join(delimiter)];
        for row in 0..self.row_count() {
            let cells: Vec<String> = self
                .columns
                .iter()
                .filter_map(|column| column.get(row))
                .map(Cell::to_string)
                .collect();
            lines.push(cells.join(delimiter));
        }
        lines.join("\n")
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.header.len()))?;
        for (name, cells) in self.iter() {
            map.serialize_entry(name, cells)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t
5\t1\t1\t1\t1\t1\t36\t92\t60\t24\t95.52\tThe
5\t1\t1\t1\t1\t2\t106\t92\t72\t24\t96.13\t(quick)
";

    #[test]
    fn test_parse_tsv() {
        let table = Table::parse_tsv(TSV);
        assert_eq!(table.header().len(), 12);
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.column("conf").unwrap(),
            [Cell::Int(-1), Cell::Int(95), Cell::Int(96)]
        );
        assert_eq!(
            table.column("text").unwrap(),
            [
                Cell::Text(String::new()),
                Cell::Text("The".into()),
                Cell::Text("(quick)".into())
            ]
        );
    }

    #[test]
    fn test_text_column_is_never_coerced() {
        let table = Table::parse_tsv("conf\ttext\n90\t42\n91\t7.5");
        assert_eq!(
            table.column("text").unwrap(),
            [Cell::Text("42".into()), Cell::Text("7.5".into())]
        );
    }

    #[test]
    fn test_missing_last_cell_is_padded() {
        let table = Table::parse("a b c\n1 2 3\n4 5", " ", -1);
        assert_eq!(table.column("c").unwrap(), [Cell::Text("3".into()), Cell::Text(String::new())]);
        assert_eq!(table.column("b").unwrap().len(), 2);
    }

    #[test]
    fn test_only_one_cell_is_padded() {
        let table = Table::parse("a b c\n1 2 3\n4", " ", 0);
        assert_eq!(table.column("a").unwrap().len(), 2);
        assert_eq!(table.column("b").unwrap(), [Cell::Int(2), Cell::Text(String::new())]);
        assert_eq!(table.column("c").unwrap(), [Cell::Int(3)]);
    }

    #[test]
    fn test_ragged_rows_are_skipped_per_column() {
        let table = Table::parse("a,b,c\n1\n2,3,4\n5,6,7", ",", 0);
        assert_eq!(
            table.column("a").unwrap(),
            [Cell::Text("1".into()), Cell::Text("2".into()), Cell::Text("5".into())]
        );
        assert_eq!(table.column("b").unwrap(), [Cell::Int(3), Cell::Int(6)]);
        assert_eq!(table.column("c").unwrap(), [Cell::Int(4), Cell::Int(7)]);
    }

    #[test]
    fn test_records_drop_short_rows_whole() {
        let rows = records("a,b,c\n1\n2,3,4\n5,6", ",");
        assert_eq!(
            rows,
            [
                vec![("a", "2"), ("b", "3"), ("c", "4")],
                vec![("a", "5"), ("b", "6"), ("c", "")],
            ]
        );
        assert!(records("a,b", ",").is_empty());
    }

    #[test]
    fn test_negative_string_column() {
        let table = Table::parse("a b c d e f\n1 2 3 4 5 6", " ", -1);
        assert_eq!(table.column("f").unwrap(), [Cell::Text("6".into())]);
        assert_eq!(table.column("e").unwrap(), [Cell::Int(5)]);
    }

    #[test]
    fn test_coerce() {
        assert_eq!(Cell::coerce("12"), Cell::Int(12));
        assert_eq!(Cell::coerce("-3.9"), Cell::Int(-3));
        assert_eq!(Cell::coerce(" 7 "), Cell::Int(7));
        assert_eq!(Cell::coerce("1e3"), Cell::Int(1000));
        assert_eq!(Cell::coerce("nan"), Cell::Text("nan".into()));
        assert_eq!(Cell::coerce("inf"), Cell::Text("inf".into()));
        assert_eq!(Cell::coerce("word"), Cell::Text("word".into()));
    }

    #[test]
    fn test_coerce_keeps_out_of_range_numbers_as_text() {
        assert_eq!(Cell::coerce("1e30"), Cell::Text("1e30".into()));
        assert_eq!(Cell::coerce("-1e19"), Cell::Text("-1e19".into()));
        assert_eq!(
            Cell::coerce("9223372036854775808"),
            Cell::Text("9223372036854775808".into())
        );
        assert_eq!(Cell::coerce("-9223372036854775808"), Cell::Int(i64::MIN));
        assert_eq!(Cell::coerce("1e18"), Cell::Int(1_000_000_000_000_000_000));
    }

    #[test]
    fn test_too_short_input() {
        assert!(Table::parse_tsv("").is_empty());
        assert!(Table::parse_tsv("level\tpage_num\n").is_empty());
    }

    #[test]
    fn test_parse_boxes() {
        let table = Table::parse_boxes("T 36 364 58 388 0\nh 60 364 80 392 0\n1 84 364 98 388 0\n");
        assert_eq!(table.header().join(" "), BOX_HEADER);
        assert_eq!(
            table.column("char").unwrap(),
            [Cell::Text("T".into()), Cell::Text("h".into()), Cell::Text("1".into())]
        );
        assert_eq!(table.column("right").unwrap(), [Cell::Int(58), Cell::Int(80), Cell::Int(98)]);
    }

    #[test]
    fn test_reserialize_reproduces_rows() {
        let source = "char left bottom right top page\nT 36 364 58 388 0\nh 60 364 80 392 0";
        let table = Table::parse(source, " ", 0);
        let written = table.to_delimited(" ");
        assert_eq!(written, source);
        assert_eq!(Table::parse(&written, " ", 0), table);
    }

    #[test]
    fn test_serialize_keeps_column_order() {
        let table = Table::parse("z a\n1 x", " ", -1);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"z":[1],"a":["x"]}"#);
    }
}

//! Contact list parsing and address normalization

use crate::error::Result;
use std::io::Read;
use std::path::Path;

/// One broadcast recipient, as parsed from the contact table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub number: String,
}

/// Read contacts from a CSV file
pub fn read_contacts(path: &Path) -> Result<Vec<Contact>> {
    let file = std::fs::File::open(path)?;
    parse_contacts(file)
}

/// Parse contacts from any CSV source.
///
/// The first record is always a header and is discarded regardless of its
/// content. Rows with fewer than two columns, or whose first two columns
/// trim to empty, are dropped silently; only a structurally broken stream
/// is an error. Order is preserved and duplicates are kept.
pub fn parse_contacts<R: Read>(source: R) -> Result<Vec<Contact>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut contacts = Vec::new();
    for record in reader.records() {
        let record = record?;

        let name = record.get(0).unwrap_or("").trim();
        let number = record.get(1).unwrap_or("").trim();
        if name.is_empty() || number.is_empty() {
            continue;
        }

        contacts.push(Contact {
            name: name.to_string(),
            number: number.to_string(),
        });
    }

    Ok(contacts)
}

/// Strip formatting characters from a raw number for the backend lookup.
/// The parsed contact keeps its original value.
pub fn normalize_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '+' | '(' | ')'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<Contact> {
        parse_contacts(input.as_bytes()).unwrap()
    }

    #[test]
    fn test_header_always_skipped() {
        let contacts = parse("name,number\nAlice,15550100\n");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Alice");

        // Even a header that looks like data is discarded
        let contacts = parse("Bob,15550101\nAlice,15550100\n");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Alice");
    }

    #[test]
    fn test_short_rows_dropped() {
        let contacts = parse("name,number\nAlice,15550100\nBobOnly\nCarol,15550102\n");
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name, "Alice");
        assert_eq!(contacts[1].name, "Carol");
    }

    #[test]
    fn test_empty_fields_dropped() {
        let contacts = parse("name,number\n  ,15550100\nBob,   \nCarol,15550102\n");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Carol");
    }

    #[test]
    fn test_fields_trimmed() {
        let contacts = parse("name,number\n  Alice  , +1 555-0100 \n");
        assert_eq!(contacts[0].name, "Alice");
        assert_eq!(contacts[0].number, "+1 555-0100");
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let contacts = parse("name,number\nAlice,1\nBob,2\nAlice,1\n");
        let names: Vec<&str> = contacts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Alice"]);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let contacts = parse("name,number,note\nAlice,15550100,vip\n");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].number, "15550100");
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(parse("name,number\n").is_empty());
    }

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("+1 555-0100"), "15550100");
        assert_eq!(normalize_number("(617) 555-1234"), "6175551234");
        assert_eq!(normalize_number("15550101"), "15550101");
        assert_eq!(normalize_number("+44 7911 123456"), "447911123456");
    }

    #[test]
    fn test_normalize_leaves_other_chars() {
        // Only formatting characters are stripped; anything else is the
        // backend's problem to reject.
        assert_eq!(normalize_number("555.0100"), "555.0100");
    }
}

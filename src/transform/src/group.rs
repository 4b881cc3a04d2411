//! Partition rows into series by their tag values.

use std::collections::HashMap;

use crate::row::Row;

/// Delimiter used when joining tag values into a display key.
pub const KEY_DELIMITER: &str = ",";

/// Rows sharing identical tag values.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Rendered tag values joined with [`KEY_DELIMITER`].
    pub key: String,
    pub rows: Vec<Row>,
}

/// Bucket rows by the values of `tags`, read in the given column order.
///
/// Buckets keep row arrival order and are returned in order of first
/// appearance. Rows are compared on the value sequence itself, so values
/// containing the delimiter never merge distinct groups.
pub fn group_rows(rows: Vec<Row>, tags: &[String]) -> Vec<Group> {
    let mut index: HashMap<Vec<Option<String>>, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for row in rows {
        let identity: Vec<Option<String>> = tags
            .iter()
            .map(|tag| row.get(tag).map(|value| value.render()))
            .collect();

        match index.get(&identity) {
            Some(&slot) => groups[slot].rows.push(row),
            None => {
                let key = identity
                    .iter()
                    .flatten()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(KEY_DELIMITER);
                index.insert(identity, groups.len());
                groups.push(Group {
                    key,
                    rows: vec![row],
                });
            }
        }
    }

    tracing::debug!(groups = groups.len(), "grouped rows by tags");
    groups
}

//! Client/server resource field synthesis.
//!
//! Flow rows describe each endpoint through a family of columns whose names
//! depend on the endpoint's node type (`pod_0`, `pod_id_0`, `ip_1`, ...).
//! This stage derives a uniform `{role}_resource`, `{role}_resource_id` and
//! `{role}_resource_type` triple from whichever family is present.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::row::Row;
use crate::value::ScalarValue;

/// Endpoint side of a flow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Client, Role::Server];

    fn suffix(self) -> &'static str {
        match self {
            Role::Client => "_0",
            Role::Server => "_1",
        }
    }

    fn field(self, name: &str) -> String {
        match self {
            Role::Client => format!("client_{name}"),
            Role::Server => format!("server_{name}"),
        }
    }

    fn prefix_rules(self) -> &'static [Regex] {
        match self {
            Role::Client => &CLIENT_PREFIX_RULES,
            Role::Server => &SERVER_PREFIX_RULES,
        }
    }
}

// Ordered by priority. The `resource_gl<d>` family is deprecated in favour
// of `auto_*` but callers may still group by it, so it stays as the last
// resort.
static CLIENT_PREFIX_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_rules(&[
        r"^(auto_instance)_id_0$",
        r"^(auto_service)_id_0$",
        r"^(resource_gl\d)_id_0$",
    ])
});

static SERVER_PREFIX_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_rules(&[
        r"^(auto_service)_id_1$",
        r"^(auto_instance)_id_1$",
        r"^(resource_gl\d)_id_1$",
    ])
});

fn compile_rules(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
}

const PRIORITY_FIELD: &str = "gprocess";
const IP_NODE_TYPES: [&str; 2] = ["ip", "internet_ip"];

/// Column family prefix for `role`, taken from the first rule that matches
/// any column of the row.
pub fn resolve_key_prefix(row: &Row, role: Role) -> Option<String> {
    role.prefix_rules().iter().find_map(|rule| {
        row.keys().find_map(|key| {
            rule.captures(key)
                .and_then(|captures| captures.get(1))
                .map(|prefix| prefix.as_str().to_string())
        })
    })
}

/// Add resource fields for every role whose `{role}_node_type` column is
/// present. Rows without it are returned untouched.
pub fn enrich(row: Row) -> Row {
    Role::ALL.into_iter().fold(row, |row, role| {
        if row.contains_key(&role.field("node_type")) {
            synthesize(row, role)
        } else {
            row
        }
    })
}

fn lookup(row: &Row, key: &str) -> ScalarValue {
    row.get(key).cloned().unwrap_or(ScalarValue::Null)
}

fn synthesize(mut row: Row, role: Role) -> Row {
    let suffix = role.suffix();
    let key_prefix = resolve_key_prefix(&row, role);

    if row.contains_key(PRIORITY_FIELD) {
        let id = lookup(&row, &format!("{PRIORITY_FIELD}_id{suffix}"));
        let name = lookup(&row, &format!("{PRIORITY_FIELD}{suffix}"));
        row.insert(role.field("resource_id"), id);
        row.insert(role.field("resource"), name);
        return row;
    }

    let node_type = match row.get(&role.field("node_type")) {
        Some(ScalarValue::Null) | None => String::new(),
        Some(value) => value.render(),
    };
    let key_prefix = key_prefix.unwrap_or_else(|| node_type.clone());

    let (id, name) = if IP_NODE_TYPES.contains(&node_type.as_str()) {
        let name = lookup(&row, &format!("{key_prefix}{suffix}"));
        let id = lookup(&row, &format!("{key_prefix}_id{suffix}"));
        (ScalarValue::Text(format!("{name}({id})")), name)
    } else {
        let id = row
            .get(&format!("{node_type}_id{suffix}"))
            .cloned()
            .unwrap_or_else(|| lookup(&row, &format!("{key_prefix}_id{suffix}")));
        let name = row
            .get(&format!("{node_type}{suffix}"))
            .cloned()
            .unwrap_or_else(|| lookup(&row, &format!("{key_prefix}{suffix}")));
        (id, name)
    };

    row.insert(role.field("resource_type"), ScalarValue::Text(node_type));
    row.insert(role.field("resource_id"), id);
    row.insert(role.field("resource"), name);
    row
}

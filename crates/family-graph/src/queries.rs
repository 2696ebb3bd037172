//! Read operations and the Cypher query catalog.
//!
//! Query text is constant. Identifiers and names are only ever bound as
//! parameters (`$id`, `$name`), never formatted into the query string.

use family_core::types::{NetworkRow, NetworkSets};
use family_core::{Person, PersonId};
use neo4rs::query;
use serde::Deserialize;

use crate::client::{GraphClient, GraphError};

// Every person query returns the same six columns so rows decode uniformly:
// person, father, mother, partners, sons, daughters.

macro_rules! ref_fields {
    () => {
        "{.id, .name, .gender}"
    };
}

macro_rules! person_columns {
    () => {
        concat!("p{.id, .name, .gender, .deceased, .deleted} AS person")
    };
}

macro_rules! one_hop {
    () => {
        concat!(
            "OPTIONAL MATCH (p)-[:FATHER]->(f:Person)
             WITH p, head(collect(f", ref_fields!(), ")) AS father
             OPTIONAL MATCH (p)-[:MOTHER]->(m:Person)
             WITH p, father, head(collect(m", ref_fields!(), ")) AS mother
             OPTIONAL MATCH (p)-[:PARTNER]-(s:Person)
             WITH p, father, mother, collect(DISTINCT s", ref_fields!(), ") AS partners
             OPTIONAL MATCH (c:Person)-[:FATHER|MOTHER]->(p)
             WITH p, father, mother, partners, collect(DISTINCT c", ref_fields!(), ") AS children
             RETURN ", person_columns!(), ", father, mother, partners,
                    [x IN children WHERE x.gender = 'male'] AS sons,
                    [x IN children WHERE x.gender = 'female'] AS daughters"
        )
    };
}

const BY_ID: &str = concat!("MATCH (p:Person {id: $id})\n", one_hop!());

const BY_NAME: &str = concat!(
    "MATCH (p:Person) WHERE p.name = $name\n",
    one_hop!(),
    "\nORDER BY person.id"
);

const ALL: &str = concat!(
    "MATCH (p:Person)\n",
    one_hop!(),
    "\nORDER BY person.name, person.id"
);

const CHILDREN: &str = concat!(
    "MATCH (p:Person {id: $id})
     OPTIONAL MATCH (c:Person)-[:FATHER|MOTHER]->(p)
     WITH p, collect(DISTINCT c", ref_fields!(), ") AS children
     RETURN ", person_columns!(), ", null AS father, null AS mother, [] AS partners,
            [x IN children WHERE x.gender = 'male'] AS sons,
            [x IN children WHERE x.gender = 'female'] AS daughters"
);

const FATHER: &str = concat!(
    "MATCH (p:Person {id: $id})
     OPTIONAL MATCH (p)-[:FATHER]->(f:Person)
     WITH p, head(collect(f", ref_fields!(), ")) AS father
     RETURN ", person_columns!(), ", father, null AS mother, [] AS partners,
            [] AS sons, [] AS daughters"
);

const MOTHER: &str = concat!(
    "MATCH (p:Person {id: $id})
     OPTIONAL MATCH (p)-[:MOTHER]->(m:Person)
     WITH p, head(collect(m", ref_fields!(), ")) AS mother
     RETURN ", person_columns!(), ", null AS father, mother, [] AS partners,
            [] AS sons, [] AS daughters"
);

const PARTNERS: &str = concat!(
    "MATCH (p:Person {id: $id})
     OPTIONAL MATCH (p)-[:PARTNER]-(s:Person)
     WITH p, collect(DISTINCT s", ref_fields!(), ") AS partners
     RETURN ", person_columns!(), ", null AS father, null AS mother, partners,
            [] AS sons, [] AS daughters"
);

/// A catalog person query: constant Cypher plus bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonQuery {
    cypher: &'static str,
    params: Vec<(&'static str, String)>,
}

impl PersonQuery {
    pub fn by_id(id: &PersonId) -> Self {
        Self::with_id(BY_ID, id)
    }

    pub fn by_name(name: &str) -> Self {
        Self {
            cypher: BY_NAME,
            params: vec![("name", name.to_string())],
        }
    }

    /// Every person with a one-hop expansion of their relationships.
    pub fn all() -> Self {
        Self {
            cypher: ALL,
            params: Vec::new(),
        }
    }

    pub fn children(id: &PersonId) -> Self {
        Self::with_id(CHILDREN, id)
    }

    pub fn father(id: &PersonId) -> Self {
        Self::with_id(FATHER, id)
    }

    pub fn mother(id: &PersonId) -> Self {
        Self::with_id(MOTHER, id)
    }

    pub fn partners(id: &PersonId) -> Self {
        Self::with_id(PARTNERS, id)
    }

    fn with_id(cypher: &'static str, id: &PersonId) -> Self {
        Self {
            cypher,
            params: vec![("id", id.0.clone())],
        }
    }

    pub fn cypher(&self) -> &'static str {
        self.cypher
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    pub(crate) fn to_query(&self) -> neo4rs::Query {
        bind(self.cypher, &self.params)
    }
}

// ── Network Export ───────────────────────────────────────────────

/// One named result set of a network export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSet {
    pub name: &'static str,
    pub cypher: &'static str,
    pub columns: &'static [&'static str],
}

const NODE_COLUMNS: &[&str] = &["id", "name", "gender"];
const LINK_COLUMNS: &[&str] = &["source", "sname", "target", "tname", "relation"];

macro_rules! link_return {
    ($relation:literal) => {
        concat!(
            " RETURN s.id AS source, s.name AS sname, t.id AS target, t.name AS tname, '",
            $relation,
            "' AS relation"
        )
    };
}

const ALL_NETWORK: &[NetworkSet] = &[
    NetworkSet {
        name: "nodes",
        cypher: "MATCH (p:Person) RETURN p.id AS id, p.name AS name, p.gender AS gender ORDER BY p.id",
        columns: NODE_COLUMNS,
    },
    NetworkSet {
        name: "fathers",
        cypher: concat!("MATCH (s:Person)-[:FATHER]->(t:Person)", link_return!("father")),
        columns: LINK_COLUMNS,
    },
    NetworkSet {
        name: "mothers",
        cypher: concat!("MATCH (s:Person)-[:MOTHER]->(t:Person)", link_return!("mother")),
        columns: LINK_COLUMNS,
    },
    NetworkSet {
        name: "partners",
        cypher: concat!("MATCH (s:Person)-[:PARTNER]->(t:Person)", link_return!("partner")),
        columns: LINK_COLUMNS,
    },
];

const PERSON_NETWORK: &[NetworkSet] = &[
    NetworkSet {
        name: "nodes",
        cypher: "MATCH (p:Person {id: $id})
                 OPTIONAL MATCH (p)-[:FATHER|MOTHER|PARTNER]-(n:Person)
                 WITH p, collect(DISTINCT n) AS others
                 UNWIND [p] + others AS x
                 RETURN DISTINCT x.id AS id, x.name AS name, x.gender AS gender",
        columns: NODE_COLUMNS,
    },
    NetworkSet {
        name: "fathers",
        cypher: concat!("MATCH (s:Person {id: $id})-[:FATHER]->(t:Person)", link_return!("father")),
        columns: LINK_COLUMNS,
    },
    NetworkSet {
        name: "mothers",
        cypher: concat!("MATCH (s:Person {id: $id})-[:MOTHER]->(t:Person)", link_return!("mother")),
        columns: LINK_COLUMNS,
    },
    NetworkSet {
        name: "partners",
        cypher: concat!("MATCH (s:Person {id: $id})-[:PARTNER]-(t:Person)", link_return!("partner")),
        columns: LINK_COLUMNS,
    },
    NetworkSet {
        name: "sons",
        cypher: concat!(
            "MATCH (s:Person {id: $id})<-[:FATHER|MOTHER]-(t:Person) WHERE t.gender = 'male'",
            link_return!("son")
        ),
        columns: LINK_COLUMNS,
    },
    NetworkSet {
        name: "daughters",
        cypher: concat!(
            "MATCH (s:Person {id: $id})<-[:FATHER|MOTHER]-(t:Person) WHERE t.gender = 'female'",
            link_return!("daughter")
        ),
        columns: LINK_COLUMNS,
    },
];

/// A network export query: several named result sets sharing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkQuery {
    sets: &'static [NetworkSet],
    params: Vec<(&'static str, String)>,
}

impl NetworkQuery {
    /// Nodes plus father, mother and partner links for the whole graph.
    pub fn all() -> Self {
        Self {
            sets: ALL_NETWORK,
            params: Vec::new(),
        }
    }

    /// A person, their direct relatives, and every link touching the person.
    pub fn person(id: &PersonId) -> Self {
        Self {
            sets: PERSON_NETWORK,
            params: vec![("id", id.0.clone())],
        }
    }

    pub fn sets(&self) -> &'static [NetworkSet] {
        self.sets
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }
}

fn bind(cypher: &str, params: &[(&'static str, String)]) -> neo4rs::Query {
    params
        .iter()
        .fold(query(cypher), |q, (key, value)| q.param(key, value.clone()))
}

// ── Row Decoding ─────────────────────────────────────────────────

/// Scalar attributes of a person as projected by the catalog queries.
#[derive(Debug, Clone, Default, Deserialize)]
struct PersonRecord {
    id: Option<String>,
    name: Option<String>,
    gender: Option<String>,
    deceased: Option<bool>,
    deleted: Option<bool>,
}

impl From<PersonRecord> for Person {
    fn from(r: PersonRecord) -> Self {
        Person {
            id: r.id.map(PersonId),
            name: r.name,
            gender: r.gender,
            deceased: r.deceased,
            deleted: r.deleted,
            ..Default::default()
        }
    }
}

fn decode_person(row: &neo4rs::Row) -> Result<Person, GraphError> {
    let record: PersonRecord = row
        .get("person")
        .map_err(|e| GraphError::Serialization(format!("Failed to deserialize person: {e}")))?;
    let father: Option<PersonRecord> = row.get("father").unwrap_or_default();
    let mother: Option<PersonRecord> = row.get("mother").unwrap_or_default();
    let partners: Vec<PersonRecord> = row.get("partners").unwrap_or_default();
    let sons: Vec<PersonRecord> = row.get("sons").unwrap_or_default();
    let daughters: Vec<PersonRecord> = row.get("daughters").unwrap_or_default();

    let mut person = Person::from(record);
    person.father = father.map(|f| Box::new(f.into()));
    person.mother = mother.map(|m| Box::new(m.into()));
    person.partners = partners.into_iter().map(Person::from).collect();
    person.sons = sons.into_iter().map(Person::from).collect();
    person.daughters = daughters.into_iter().map(Person::from).collect();
    Ok(person)
}

fn decode_network_row(row: &neo4rs::Row, columns: &[&str]) -> NetworkRow {
    let mut out = NetworkRow::new();
    for column in columns {
        if let Ok(Some(value)) = row.get::<Option<String>>(column) {
            out.insert((*column).to_string(), value);
        }
    }
    out
}

impl GraphClient {
    /// Run a read-only catalog query and decode every row into a person.
    pub async fn search(&self, person_query: &PersonQuery) -> Result<Vec<Person>, GraphError> {
        let rows = self.query_rows(person_query.to_query()).await?;
        let mut people = Vec::with_capacity(rows.len());
        for row in rows {
            people.push(decode_person(&row)?);
        }
        tracing::debug!(count = people.len(), "Person query returned");
        Ok(people)
    }

    /// Run every named set of a network query and collect the rows by set name.
    pub async fn network_export(&self, network_query: &NetworkQuery) -> Result<NetworkSets, GraphError> {
        let mut sets = NetworkSets::new();
        for set in network_query.sets() {
            let rows = self.query_rows(bind(set.cypher, network_query.params())).await?;
            let decoded = rows
                .iter()
                .map(|row| decode_network_row(row, set.columns))
                .collect();
            sets.insert(set.name.to_string(), decoded);
        }
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let hostile = "x\"}) DETACH DELETE p //";
        let q = PersonQuery::by_name(hostile);
        assert!(!q.cypher().contains(hostile));
        assert!(q.cypher().contains("$name"));
        assert_eq!(q.params(), &[("name", hostile.to_string())]);

        let id = PersonId::from("0x1) OR 1=1");
        let q = PersonQuery::children(&id);
        assert!(!q.cypher().contains("0x1"));
        assert_eq!(q.params(), &[("id", id.0.clone())]);
    }

    #[test]
    fn test_every_person_query_returns_uniform_columns() {
        let id = PersonId::from("a");
        for q in [
            PersonQuery::by_id(&id),
            PersonQuery::by_name("n"),
            PersonQuery::all(),
            PersonQuery::children(&id),
            PersonQuery::father(&id),
            PersonQuery::mother(&id),
            PersonQuery::partners(&id),
        ] {
            for column in ["AS person", "father", "mother", "partners", "AS sons", "AS daughters"] {
                assert!(
                    q.cypher().contains(column),
                    "query is missing {column}: {}",
                    q.cypher()
                );
            }
        }
    }

    #[test]
    fn test_children_filter_by_gender() {
        let q = PersonQuery::children(&PersonId::from("a"));
        assert!(q.cypher().contains("[:FATHER|MOTHER]"));
        assert!(q.cypher().contains("x.gender = 'male'"));
        assert!(q.cypher().contains("x.gender = 'female'"));
    }

    #[test]
    fn test_all_takes_no_params() {
        assert!(PersonQuery::all().params().is_empty());
        assert!(NetworkQuery::all().params().is_empty());
    }

    #[test]
    fn test_person_network_sets() {
        let q = NetworkQuery::person(&PersonId::from("p1"));
        let names: Vec<_> = q.sets().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["nodes", "fathers", "mothers", "partners", "sons", "daughters"]
        );
        for set in q.sets() {
            assert!(set.cypher.contains("$id"), "set {} is not scoped", set.name);
            assert!(!set.cypher.contains("p1"));
        }
    }

    #[test]
    fn test_link_sets_name_their_relation() {
        for set in NetworkQuery::person(&PersonId::from("p")).sets().iter().skip(1) {
            let relation = set.name.trim_end_matches('s');
            assert!(
                set.cypher.contains(&format!("'{relation}' AS relation")),
                "set {} has wrong relation",
                set.name
            );
            assert_eq!(set.columns, LINK_COLUMNS);
        }
    }
}

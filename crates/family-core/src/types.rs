//! Core domain types for the family tree graph.
//!
//! A `Person` is the only node type. Relationships are edges between
//! persons: father and mother (single, child → parent), partners
//! (undirected), and sons/daughters which are derived by walking the
//! parent edges backwards.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Identity ──────────────────────────────────────────────────────

/// Opaque identifier of a person node, assigned by the store on creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PersonId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PersonId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Person ────────────────────────────────────────────────────────

pub const MALE: &str = "male";
pub const FEMALE: &str = "female";

/// A person record and its relationship links.
///
/// Every field is optional so the same shape serves as a create payload,
/// a patch body, a search filter, and a query result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PersonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form; only the literals "male" and "female" carry meaning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deceased: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father: Option<Box<Person>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother: Option<Box<Person>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partners: Vec<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sons: Vec<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daughters: Vec<Person>,
}

impl Person {
    pub fn named(name: impl Into<String>, gender: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            gender: Some(gender.into()),
            ..Default::default()
        }
    }

    /// A bare reference to an existing node, used to link relations on write.
    pub fn reference(id: impl Into<PersonId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn is_male(&self) -> bool {
        self.gender.as_deref() == Some(MALE)
    }

    pub fn is_female(&self) -> bool {
        self.gender.as_deref() == Some(FEMALE)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// The scalar attributes of this person, without any relationship links.
    pub fn summary(&self) -> Person {
        Person {
            id: self.id.clone(),
            name: self.name.clone(),
            gender: self.gender.clone(),
            deceased: self.deceased,
            deleted: self.deleted,
            ..Default::default()
        }
    }

    /// Overwrite the scalar attributes that are present in `patch`.
    ///
    /// Relationship links are left alone; stores apply those themselves.
    pub fn apply_scalars(&mut self, patch: &Person) {
        if patch.name.is_some() {
            self.name = patch.name.clone();
        }
        if patch.gender.is_some() {
            self.gender = patch.gender.clone();
        }
        if patch.deceased.is_some() {
            self.deceased = patch.deceased;
        }
        if patch.deleted.is_some() {
            self.deleted = patch.deleted;
        }
    }

    /// Split a list of children into (sons, daughters) by gender.
    ///
    /// Children with any other gender value appear in neither list.
    pub fn split_children(children: Vec<Person>) -> (Vec<Person>, Vec<Person>) {
        let mut sons = Vec::new();
        let mut daughters = Vec::new();
        for child in children {
            if child.is_male() {
                sons.push(child);
            } else if child.is_female() {
                daughters.push(child);
            }
        }
        (sons, daughters)
    }
}

// ── Relations ─────────────────────────────────────────────────────

/// The kind of a link in a network export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Father,
    Mother,
    Partner,
    Son,
    Daughter,
}

impl Relation {
    pub const ALL: [Relation; 5] = [
        Relation::Father,
        Relation::Mother,
        Relation::Partner,
        Relation::Son,
        Relation::Daughter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Father => "father",
            Self::Mother => "mother",
            Self::Partner => "partner",
            Self::Son => "son",
            Self::Daughter => "daughter",
        }
    }

    /// Name of the result set carrying links of this kind.
    pub fn set_name(&self) -> &'static str {
        match self {
            Self::Father => "fathers",
            Self::Mother => "mothers",
            Self::Partner => "partners",
            Self::Son => "sons",
            Self::Daughter => "daughters",
        }
    }
}

// ── Network Export ────────────────────────────────────────────────

/// Row of a network export result set: column name → value.
pub type NetworkRow = HashMap<String, String>;

/// Named result sets returned by a network export query.
pub type NetworkSets = HashMap<String, Vec<NetworkRow>>;

pub const NODES_SET: &str = "nodes";

/// Flattened nodes/links view of the relationship graph for visualization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Network {
    pub nodes: Vec<NetworkRow>,
    pub links: Vec<NetworkRow>,
}

impl Network {
    /// Flatten named result sets: `nodes` becomes the node list and every
    /// relation set is appended to the link list in `Relation::ALL` order.
    pub fn from_sets(mut sets: NetworkSets) -> Self {
        let nodes = sets.remove(NODES_SET).unwrap_or_default();
        let mut links = Vec::new();
        for relation in Relation::ALL {
            if let Some(rows) = sets.remove(relation.set_name()) {
                links.extend(rows);
            }
        }
        Self { nodes, links }
    }
}

/// Build a node row for a network export.
pub fn node_row(person: &Person) -> NetworkRow {
    let mut row = NetworkRow::new();
    if let Some(id) = &person.id {
        row.insert("id".to_string(), id.0.clone());
    }
    if let Some(name) = &person.name {
        row.insert("name".to_string(), name.clone());
    }
    if let Some(gender) = &person.gender {
        row.insert("gender".to_string(), gender.clone());
    }
    row
}

/// Build a link row for a network export.
pub fn link_row(source: &Person, target: &Person, relation: Relation) -> NetworkRow {
    let mut row = NetworkRow::new();
    if let Some(id) = &source.id {
        row.insert("source".to_string(), id.0.clone());
    }
    row.insert("sname".to_string(), source.display_name().to_string());
    if let Some(id) = &target.id {
        row.insert("target".to_string(), id.0.clone());
    }
    row.insert("tname".to_string(), target.display_name().to_string());
    row.insert("relation".to_string(), relation.as_str().to_string());
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_omitted() {
        let person = Person::named("Alice", "female");
        let json = serde_json::to_value(&person).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Alice", "gender": "female"}));
    }

    #[test]
    fn nested_relations_deserialize() {
        let person: Person = serde_json::from_str(
            r#"{"name":"Bob","gender":"male","father":{"id":"abc"},"partners":[{"name":"Carol"}]}"#,
        )
        .unwrap();
        assert_eq!(person.father.unwrap().id, Some(PersonId::from("abc")));
        assert_eq!(person.partners[0].name.as_deref(), Some("Carol"));
        assert!(person.mother.is_none());
    }

    #[test]
    fn gender_is_compared_literally() {
        assert!(Person::named("A", "male").is_male());
        assert!(!Person::named("A", "Male").is_male());
        assert!(!Person::named("A", "other").is_female());
        assert!(!Person::default().is_male());
    }

    #[test]
    fn apply_scalars_keeps_absent_fields() {
        let mut stored = Person::named("Alice", "female");
        stored.father = Some(Box::new(Person::reference("f1")));

        let patch = Person {
            name: Some("Alicia".to_string()),
            ..Default::default()
        };
        stored.apply_scalars(&patch);

        assert_eq!(stored.name.as_deref(), Some("Alicia"));
        assert_eq!(stored.gender.as_deref(), Some("female"));
        assert!(stored.father.is_some());
    }

    #[test]
    fn split_children_by_gender() {
        let (sons, daughters) = Person::split_children(vec![
            Person::named("S", "male"),
            Person::named("D", "female"),
            Person::named("X", "unknown"),
        ]);
        assert_eq!(sons.len(), 1);
        assert_eq!(daughters.len(), 1);
        assert_eq!(daughters[0].display_name(), "D");
    }

    #[test]
    fn network_flattens_relation_sets_in_order() {
        let mut sets = NetworkSets::new();
        let parent = Person {
            id: Some("p".into()),
            ..Person::named("Parent", "male")
        };
        let child = Person {
            id: Some("c".into()),
            ..Person::named("Child", "female")
        };
        sets.insert(NODES_SET.to_string(), vec![node_row(&parent), node_row(&child)]);
        sets.insert(
            "daughters".to_string(),
            vec![link_row(&parent, &child, Relation::Daughter)],
        );
        sets.insert(
            "fathers".to_string(),
            vec![link_row(&child, &parent, Relation::Father)],
        );

        let network = Network::from_sets(sets);
        assert_eq!(network.nodes.len(), 2);
        assert_eq!(network.links.len(), 2);
        assert_eq!(network.links[0]["relation"], "father");
        assert_eq!(network.links[1]["relation"], "daughter");
        assert_eq!(network.links[1]["source"], "p");
        assert_eq!(network.links[1]["tname"], "Child");
    }
}

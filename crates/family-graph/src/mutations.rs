//! Write operations for the family graph.
//!
//! A nested `Person` payload is first flattened into a `WritePlan`: node
//! writes with set semantics (present fields overwrite, absent fields stay)
//! and relationship links. Both stores apply the same plan.

use family_core::{Person, PersonId};
use neo4rs::query;

use crate::client::{GraphClient, GraphError};

/// Relationship edge kinds stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Father,
    Mother,
    Partner,
}

impl LinkKind {
    fn rel_type(&self) -> &'static str {
        match self {
            Self::Father => "FATHER",
            Self::Mother => "MOTHER",
            Self::Partner => "PARTNER",
        }
    }
}

/// Scalar write for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWrite {
    pub id: PersonId,
    /// The node is new and gets created rather than matched.
    pub create: bool,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub deceased: Option<bool>,
    pub deleted: Option<bool>,
}

impl NodeWrite {
    fn has_fields(&self) -> bool {
        self.name.is_some() || self.gender.is_some() || self.deceased.is_some() || self.deleted.is_some()
    }

    /// The scalar attributes as a person, for stores that keep whole records.
    pub fn as_person(&self) -> Person {
        Person {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            gender: self.gender.clone(),
            deceased: self.deceased,
            deleted: self.deleted,
            ..Default::default()
        }
    }
}

/// A relationship to (re)write. Father and mother links replace any
/// previous link of the same kind; partner links are added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkWrite {
    pub from: PersonId,
    pub to: PersonId,
    pub kind: LinkKind,
}

/// Flattened writes for one create or update call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WritePlan {
    pub root: PersonId,
    pub nodes: Vec<NodeWrite>,
    pub links: Vec<LinkWrite>,
}

impl WritePlan {
    /// Plan a create: the root always gets a fresh identifier.
    pub fn create(person: &Person) -> Self {
        let mut plan = Self::default();
        plan.root = plan.add(person, Some(PersonId::new()));
        plan
    }

    /// Plan an update of an existing node; the identifier comes from the caller.
    pub fn update(id: &PersonId, patch: &Person) -> Self {
        let mut plan = Self::default();
        let mut patch = patch.clone();
        patch.id = Some(id.clone());
        plan.root = plan.add(&patch, None);
        plan
    }

    fn add(&mut self, person: &Person, fresh: Option<PersonId>) -> PersonId {
        let (id, create) = match (fresh, &person.id) {
            (Some(new_id), _) => (new_id, true),
            (None, Some(existing)) => (existing.clone(), false),
            (None, None) => (PersonId::new(), true),
        };

        let node = NodeWrite {
            id: id.clone(),
            create,
            name: person.name.clone(),
            gender: person.gender.clone(),
            deceased: person.deceased,
            deleted: person.deleted,
        };
        if node.create || node.has_fields() {
            self.nodes.push(node);
        }

        if let Some(father) = &person.father {
            let to = self.add(father, None);
            self.link(&id, to, LinkKind::Father);
        }
        if let Some(mother) = &person.mother {
            let to = self.add(mother, None);
            self.link(&id, to, LinkKind::Mother);
        }
        for partner in &person.partners {
            let to = self.add(partner, None);
            self.link(&id, to, LinkKind::Partner);
        }
        id
    }

    /// Existing persons the plan links to, in first-seen order. Each must
    /// exist before any write of the plan is applied.
    pub fn references(&self) -> Vec<&PersonId> {
        let mut refs: Vec<&PersonId> = Vec::new();
        for link in &self.links {
            let created = self.nodes.iter().any(|n| n.create && n.id == link.to);
            if !created && !refs.contains(&&link.to) {
                refs.push(&link.to);
            }
        }
        refs
    }

    fn link(&mut self, from: &PersonId, to: PersonId, kind: LinkKind) {
        self.links.push(LinkWrite {
            from: from.clone(),
            to,
            kind,
        });
    }
}

impl GraphClient {
    /// Apply a write plan in a single transaction. Nothing is written when a
    /// referenced person does not exist.
    pub async fn create_or_update(&self, plan: &WritePlan) -> Result<PersonId, GraphError> {
        let mut txn = self.start_txn().await?;

        for id in plan.references() {
            let mut rows = txn
                .execute(query("MATCH (p:Person {id: $id}) RETURN p.id AS id").param("id", id.0.clone()))
                .await?;
            let mut found = false;
            while rows.next(txn.handle()).await?.is_some() {
                found = true;
            }
            if !found {
                txn.rollback().await?;
                tracing::debug!(root = %plan.root, missing = %id, "Write rejected, referenced person missing");
                return Err(GraphError::NotFound { id: id.0.clone() });
            }
        }

        for node in &plan.nodes {
            txn.run(node_query(node)).await?;
        }

        for link in &plan.links {
            if link.kind != LinkKind::Partner {
                let cypher = format!(
                    "MATCH (a:Person {{id: $from}})-[old:{rel}]->() DELETE old",
                    rel = link.kind.rel_type()
                );
                txn.run(query(&cypher).param("from", link.from.0.clone()))
                    .await?;
            }

            let cypher = match link.kind {
                LinkKind::Partner => "MATCH (a:Person {id: $from}), (b:Person {id: $to})
                     MERGE (a)-[:PARTNER]-(b)"
                    .to_string(),
                kind => format!(
                    "MATCH (a:Person {{id: $from}}), (b:Person {{id: $to}})
                     MERGE (a)-[:{rel}]->(b)",
                    rel = kind.rel_type()
                ),
            };
            txn.run(
                query(&cypher)
                    .param("from", link.from.0.clone())
                    .param("to", link.to.0.clone()),
            )
            .await?;
        }

        txn.commit().await?;
        tracing::debug!(
            root = %plan.root,
            nodes = plan.nodes.len(),
            links = plan.links.len(),
            "Person write committed"
        );
        Ok(plan.root.clone())
    }

    /// Whether a person node with this identifier exists.
    pub async fn exists(&self, id: &PersonId) -> Result<bool, GraphError> {
        let q = query("MATCH (p:Person {id: $id}) RETURN count(p) AS cnt").param("id", id.0.clone());
        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0) > 0),
            None => Ok(false),
        }
    }

    /// Remove a person: count the dependents pointing at it, then drop every
    /// edge and the node itself. Returns the number of incoming edges removed.
    pub async fn delete_person(&self, id: &PersonId) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (p:Person {id: $id})<-[r:FATHER|MOTHER|PARTNER]-(:Person)
             RETURN count(r) AS dependents",
        )
        .param("id", id.0.clone());
        let dependents = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("dependents").unwrap_or(0),
            None => 0,
        };

        let q = query("MATCH (p:Person {id: $id}) DETACH DELETE p").param("id", id.0.clone());
        self.run(q).await?;

        tracing::debug!(id = %id, dependents, "Person deleted");
        Ok(dependents)
    }
}

/// Node write query. Only fixed attribute names appear in the text; values
/// are always parameters.
fn node_query(node: &NodeWrite) -> neo4rs::Query {
    let mut assignments = Vec::new();
    if node.name.is_some() {
        assignments.push("p.name = $name");
    }
    if node.gender.is_some() {
        assignments.push("p.gender = $gender");
    }
    if node.deceased.is_some() {
        assignments.push("p.deceased = $deceased");
    }
    if node.deleted.is_some() {
        assignments.push("p.deleted = $deleted");
    }

    let head = if node.create {
        "CREATE (p:Person {id: $id})"
    } else {
        "MATCH (p:Person {id: $id})"
    };
    let cypher = if assignments.is_empty() {
        head.to_string()
    } else {
        format!("{head} SET {}", assignments.join(", "))
    };

    let mut q = query(&cypher).param("id", node.id.0.clone());
    if let Some(name) = &node.name {
        q = q.param("name", name.clone());
    }
    if let Some(gender) = &node.gender {
        q = q.param("gender", gender.clone());
    }
    if let Some(deceased) = node.deceased {
        q = q.param("deceased", deceased);
    }
    if let Some(deleted) = node.deleted {
        q = q.param("deleted", deleted);
    }
    q
}

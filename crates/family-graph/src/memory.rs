//! In-process person store with the same semantics as the Neo4j store.
//!
//! Used for local development (`graph_hosts = "memory"`) and tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use family_core::types::{link_row, node_row, NetworkRow, NetworkSets, Relation, NODES_SET};
use family_core::{Network, Person, PersonId};
use tokio::sync::RwLock;

use crate::client::GraphError;
use crate::mutations::{LinkKind, WritePlan};
use crate::store::PersonStore;

#[derive(Debug, Clone, Default)]
struct Record {
    /// Scalar attributes only.
    person: Person,
    father: Option<PersonId>,
    mother: Option<PersonId>,
    /// Partner edges stored on this side; lookups match both directions.
    partners: BTreeSet<PersonId>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<PersonId, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn apply(records: &mut BTreeMap<PersonId, Record>, plan: &WritePlan) -> Result<(), GraphError> {
    if let Some(missing) = plan.references().into_iter().find(|id| !records.contains_key(*id)) {
        return Err(GraphError::NotFound {
            id: missing.0.clone(),
        });
    }

    for node in &plan.nodes {
        if node.create {
            records.insert(
                node.id.clone(),
                Record {
                    person: node.as_person(),
                    ..Default::default()
                },
            );
        } else if let Some(record) = records.get_mut(&node.id) {
            record.person.apply_scalars(&node.as_person());
        }
    }

    for link in &plan.links {
        match link.kind {
            LinkKind::Father | LinkKind::Mother => {
                if let Some(record) = records.get_mut(&link.from) {
                    if link.kind == LinkKind::Father {
                        record.father = Some(link.to.clone());
                    } else {
                        record.mother = Some(link.to.clone());
                    }
                }
            }
            LinkKind::Partner => {
                let reverse = records
                    .get(&link.to)
                    .is_some_and(|r| r.partners.contains(&link.from));
                if !reverse {
                    if let Some(record) = records.get_mut(&link.from) {
                        record.partners.insert(link.to.clone());
                    }
                }
            }
        }
    }
    Ok(())
}

/// id, name and gender of a related person.
fn reference(records: &BTreeMap<PersonId, Record>, id: &PersonId) -> Option<Person> {
    records.get(id).map(|r| Person {
        id: r.person.id.clone(),
        name: r.person.name.clone(),
        gender: r.person.gender.clone(),
        ..Default::default()
    })
}

fn partners_of(records: &BTreeMap<PersonId, Record>, id: &PersonId) -> Vec<Person> {
    let mut ids: BTreeSet<&PersonId> = BTreeSet::new();
    if let Some(record) = records.get(id) {
        ids.extend(record.partners.iter());
    }
    for (other_id, other) in records {
        if other.partners.contains(id) {
            ids.insert(other_id);
        }
    }
    ids.into_iter()
        .filter_map(|p| reference(records, p))
        .collect()
}

fn children_of(records: &BTreeMap<PersonId, Record>, id: &PersonId) -> Vec<Person> {
    records
        .iter()
        .filter(|(_, r)| r.father.as_ref() == Some(id) || r.mother.as_ref() == Some(id))
        .filter_map(|(child_id, _)| reference(records, child_id))
        .collect()
}

fn one_hop(records: &BTreeMap<PersonId, Record>, id: &PersonId) -> Option<Person> {
    let record = records.get(id)?;
    let mut person = record.person.clone();
    person.father = record
        .father
        .as_ref()
        .and_then(|f| reference(records, f))
        .map(Box::new);
    person.mother = record
        .mother
        .as_ref()
        .and_then(|m| reference(records, m))
        .map(Box::new);
    person.partners = partners_of(records, id);
    let (sons, daughters) = Person::split_children(children_of(records, id));
    person.sons = sons;
    person.daughters = daughters;
    Some(person)
}

fn link_set(links: Vec<NetworkRow>, relation: Relation, sets: &mut NetworkSets) {
    sets.insert(relation.set_name().to_string(), links);
}

#[async_trait]
impl PersonStore for MemoryStore {
    async fn get(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        let records = self.records.read().await;
        Ok(one_hop(&records, id))
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Person>, GraphError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(_, r)| r.person.name.as_deref() == Some(name))
            .filter_map(|(id, _)| one_hop(&records, id))
            .collect())
    }

    async fn list(&self) -> Result<Vec<Person>, GraphError> {
        let records = self.records.read().await;
        let mut people: Vec<Person> = records
            .keys()
            .filter_map(|id| one_hop(&records, id))
            .collect();
        // Neo4j sorts missing names last.
        people.sort_by(|a, b| {
            (a.name.is_none(), &a.name, &a.id).cmp(&(b.name.is_none(), &b.name, &b.id))
        });
        Ok(people)
    }

    async fn children(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        let records = self.records.read().await;
        Ok(records.get(id).map(|record| {
            let mut person = record.person.clone();
            let (sons, daughters) = Person::split_children(children_of(&records, id));
            person.sons = sons;
            person.daughters = daughters;
            person
        }))
    }

    async fn father(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        let records = self.records.read().await;
        Ok(records.get(id).map(|record| {
            let mut person = record.person.clone();
            person.father = record
                .father
                .as_ref()
                .and_then(|f| reference(&records, f))
                .map(Box::new);
            person
        }))
    }

    async fn mother(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        let records = self.records.read().await;
        Ok(records.get(id).map(|record| {
            let mut person = record.person.clone();
            person.mother = record
                .mother
                .as_ref()
                .and_then(|m| reference(&records, m))
                .map(Box::new);
            person
        }))
    }

    async fn partners(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        let records = self.records.read().await;
        Ok(records.get(id).map(|record| {
            let mut person = record.person.clone();
            person.partners = partners_of(&records, id);
            person
        }))
    }

    async fn create(&self, person: &Person) -> Result<Person, GraphError> {
        let plan = WritePlan::create(person);
        let mut records = self.records.write().await;
        apply(&mut records, &plan)?;
        tracing::debug!(root = %plan.root, nodes = plan.nodes.len(), "Person created in memory");
        one_hop(&records, &plan.root).ok_or_else(|| GraphError::NotFound {
            id: plan.root.0.clone(),
        })
    }

    async fn update(&self, id: &PersonId, patch: &Person) -> Result<Person, GraphError> {
        let mut records = self.records.write().await;
        if !records.contains_key(id) {
            return Err(GraphError::NotFound { id: id.0.clone() });
        }
        let plan = WritePlan::update(id, patch);
        apply(&mut records, &plan)?;
        one_hop(&records, id).ok_or_else(|| GraphError::NotFound { id: id.0.clone() })
    }

    async fn delete(&self, id: &PersonId) -> Result<i64, GraphError> {
        let mut records = self.records.write().await;
        if records.remove(id).is_none() {
            return Ok(0);
        }

        let mut dependents = 0;
        for record in records.values_mut() {
            if record.father.as_ref() == Some(id) {
                record.father = None;
                dependents += 1;
            }
            if record.mother.as_ref() == Some(id) {
                record.mother = None;
                dependents += 1;
            }
            if record.partners.remove(id) {
                dependents += 1;
            }
        }
        Ok(dependents)
    }

    async fn network(&self) -> Result<Network, GraphError> {
        let records = self.records.read().await;
        let mut sets = NetworkSets::new();
        sets.insert(
            NODES_SET.to_string(),
            records.values().map(|r| node_row(&r.person)).collect(),
        );

        let mut fathers = Vec::new();
        let mut mothers = Vec::new();
        let mut partners = Vec::new();
        for record in records.values() {
            if let Some(father) = record.father.as_ref().and_then(|f| records.get(f)) {
                fathers.push(link_row(&record.person, &father.person, Relation::Father));
            }
            if let Some(mother) = record.mother.as_ref().and_then(|m| records.get(m)) {
                mothers.push(link_row(&record.person, &mother.person, Relation::Mother));
            }
            for partner in record.partners.iter().filter_map(|p| records.get(p)) {
                partners.push(link_row(&record.person, &partner.person, Relation::Partner));
            }
        }
        link_set(fathers, Relation::Father, &mut sets);
        link_set(mothers, Relation::Mother, &mut sets);
        link_set(partners, Relation::Partner, &mut sets);
        Ok(Network::from_sets(sets))
    }

    async fn person_network(&self, id: &PersonId) -> Result<Network, GraphError> {
        let records = self.records.read().await;
        let Some(subject) = one_hop(&records, id) else {
            return Ok(Network::default());
        };

        let mut relatives: Vec<&Person> = Vec::new();
        relatives.extend(subject.father.as_deref());
        relatives.extend(subject.mother.as_deref());
        relatives.extend(subject.partners.iter());
        // Children of any gender are nodes; only sons and daughters get links.
        let children = children_of(&records, id);
        relatives.extend(children.iter());

        let mut seen = BTreeSet::new();
        let mut nodes = vec![node_row(&subject)];
        seen.insert(id.clone());
        for relative in &relatives {
            if let Some(rid) = &relative.id {
                if seen.insert(rid.clone()) {
                    nodes.push(node_row(relative));
                }
            }
        }

        let mut sets = NetworkSets::new();
        sets.insert(NODES_SET.to_string(), nodes);
        let single = |p: Option<&Person>, relation| -> Vec<NetworkRow> {
            p.map(|t| vec![link_row(&subject, t, relation)]).unwrap_or_default()
        };
        let many = |ps: &[Person], relation| -> Vec<NetworkRow> {
            ps.iter().map(|t| link_row(&subject, t, relation)).collect()
        };
        link_set(single(subject.father.as_deref(), Relation::Father), Relation::Father, &mut sets);
        link_set(single(subject.mother.as_deref(), Relation::Mother), Relation::Mother, &mut sets);
        link_set(many(subject.partners.as_slice(), Relation::Partner), Relation::Partner, &mut sets);
        link_set(many(subject.sons.as_slice(), Relation::Son), Relation::Son, &mut sets);
        link_set(many(subject.daughters.as_slice(), Relation::Daughter), Relation::Daughter, &mut sets);
        Ok(Network::from_sets(sets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(person: Person) -> PersonId {
        person.id.unwrap()
    }

    async fn seeded() -> (MemoryStore, PersonId, PersonId) {
        let store = MemoryStore::new();
        let alice = store.create(&Person::named("Alice", "female")).await.unwrap();
        let alice_id = alice.id.unwrap();

        let mut bob = Person::named("Bob", "male");
        bob.mother = Some(Box::new(Person::reference(alice_id.clone())));
        let bob = store.create(&bob).await.unwrap();
        (store, alice_id, bob.id.unwrap())
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let store = MemoryStore::new();
        let mut carol = Person::named("Carol", "female");
        carol.deceased = Some(true);
        let created = store.create(&carol).await.unwrap();
        let id = created.id.clone().unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.name.as_deref(), Some("Carol"));
        assert_eq!(fetched.gender.as_deref(), Some("female"));
        assert_eq!(fetched.deceased, Some(true));
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_relations_resolve_both_ways() {
        let (store, alice, bob) = seeded().await;

        let mother = store.mother(&bob).await.unwrap().unwrap();
        assert_eq!(mother.mother.unwrap().id, Some(alice.clone()));

        let children = store.children(&alice).await.unwrap().unwrap();
        assert_eq!(children.sons.len(), 1);
        assert!(children.daughters.is_empty());

        let father = store.father(&bob).await.unwrap().unwrap();
        assert!(father.father.is_none());
    }

    #[tokio::test]
    async fn test_partners_are_undirected_and_not_duplicated() {
        let (store, alice, bob) = seeded().await;
        let mut patch = Person::default();
        patch.partners = vec![Person::reference(bob.clone())];
        store.update(&alice, &patch).await.unwrap();

        let mut reverse = Person::default();
        reverse.partners = vec![Person::reference(alice.clone())];
        store.update(&bob, &reverse).await.unwrap();

        let bobs = store.partners(&bob).await.unwrap().unwrap();
        assert_eq!(bobs.partners.len(), 1);
        let network = store.network().await.unwrap();
        assert_eq!(
            network.links.iter().filter(|l| l["relation"] == "partner").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_keeps_unspecified_fields_and_links() {
        let (store, alice, bob) = seeded().await;
        let patch = Person {
            name: Some("Robert".to_string()),
            ..Default::default()
        };
        let updated = store.update(&bob, &patch).await.unwrap();
        assert_eq!(updated.name.as_deref(), Some("Robert"));
        assert_eq!(updated.gender.as_deref(), Some("male"));
        assert_eq!(updated.mother.unwrap().id, Some(alice));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(&PersonId::from("missing"), &Person::named("X", "male"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_detaches_dependents() {
        let (store, alice, bob) = seeded().await;
        let mut carol = Person::named("Carol", "male");
        carol.partners = vec![Person::reference(alice.clone())];
        let carol = created(store.create(&carol).await.unwrap());

        // Two incoming edges: Bob's mother link and Carol's partner link.
        let removed = store.delete(&alice).await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get(&alice).await.unwrap().is_none());
        assert!(store.find_by_name("Alice").await.unwrap().is_empty());
        let bob_now = store.get(&bob).await.unwrap().unwrap();
        assert!(bob_now.mother.is_none());
        let carol_now = store.partners(&carol).await.unwrap().unwrap();
        assert!(carol_now.partners.is_empty());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_deleted_child_leaves_parent_children() {
        let (store, alice, bob) = seeded().await;
        store.delete(&bob).await.unwrap();
        let parent = store.children(&alice).await.unwrap().unwrap();
        assert!(parent.sons.is_empty());
        assert!(parent.daughters.is_empty());
        assert!(store.network().await.unwrap().links.is_empty());
    }

    #[tokio::test]
    async fn test_link_to_missing_person_is_rejected() {
        let (store, alice, bob) = seeded().await;
        let patch = Person {
            name: Some("Robert".to_string()),
            mother: Some(Box::new(Person::reference("typo"))),
            ..Default::default()
        };
        let err = store.update(&bob, &patch).await.unwrap_err();
        assert!(matches!(err, GraphError::NotFound { ref id } if id == "typo"));

        let unchanged = store.get(&bob).await.unwrap().unwrap();
        assert_eq!(unchanged.name.as_deref(), Some("Bob"));
        assert_eq!(unchanged.mother.unwrap().id, Some(alice));

        let mut orphan = Person::named("Orphan", "female");
        orphan.father = Some(Box::new(Person::reference("nobody")));
        assert!(store.create(&orphan).await.is_err());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_person_network_includes_relatives() {
        let (store, alice, bob) = seeded().await;
        let network = store.person_network(&alice).await.unwrap();
        assert_eq!(network.nodes.len(), 2);
        assert_eq!(network.links.len(), 1);
        assert_eq!(network.links[0]["relation"], "son");
        assert_eq!(network.links[0]["target"], bob.0);

        let mut kid = Person::named("Kit", "unknown");
        kid.mother = Some(Box::new(Person::reference(alice.clone())));
        store.create(&kid).await.unwrap();
        let network = store.person_network(&alice).await.unwrap();
        assert_eq!(network.nodes.len(), 3);
        assert_eq!(network.links.len(), 1);

        let empty = store.person_network(&PersonId::from("nope")).await.unwrap();
        assert!(empty.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let (store, _, _) = seeded().await;
        store.create(&Person::named("Aaron", "male")).await.unwrap();
        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name.unwrap())
            .collect();
        assert_eq!(names, vec!["Aaron", "Alice", "Bob"]);
    }
}

//! The person store seam used by the HTTP layer.

use async_trait::async_trait;
use family_core::{Network, Person, PersonId};

use crate::client::{GraphClient, GraphError};
use crate::mutations::WritePlan;
use crate::queries::{NetworkQuery, PersonQuery};

/// Typed person operations. Relationship lookups return the subject person
/// with only the requested relation filled in, or `None` when the subject
/// does not exist.
#[async_trait]
pub trait PersonStore: Send + Sync {
    async fn get(&self, id: &PersonId) -> Result<Option<Person>, GraphError>;

    async fn find_by_name(&self, name: &str) -> Result<Vec<Person>, GraphError>;

    /// Every person with a one-hop expansion of their relationships.
    async fn list(&self) -> Result<Vec<Person>, GraphError>;

    async fn children(&self, id: &PersonId) -> Result<Option<Person>, GraphError>;

    async fn father(&self, id: &PersonId) -> Result<Option<Person>, GraphError>;

    async fn mother(&self, id: &PersonId) -> Result<Option<Person>, GraphError>;

    async fn partners(&self, id: &PersonId) -> Result<Option<Person>, GraphError>;

    /// Create a person (and any new nested relatives); returns the stored record.
    async fn create(&self, person: &Person) -> Result<Person, GraphError>;

    /// Set the fields present in `patch` on an existing person.
    async fn update(&self, id: &PersonId, patch: &Person) -> Result<Person, GraphError>;

    /// Remove a person and every edge touching it. Returns the number of
    /// incoming relationship edges that were detached.
    async fn delete(&self, id: &PersonId) -> Result<i64, GraphError>;

    async fn network(&self) -> Result<Network, GraphError>;

    async fn person_network(&self, id: &PersonId) -> Result<Network, GraphError>;
}

impl GraphClient {
    async fn search_one(&self, q: PersonQuery) -> Result<Option<Person>, GraphError> {
        Ok(self.search(&q).await?.into_iter().next())
    }

    async fn fetch_written(&self, id: &PersonId) -> Result<Person, GraphError> {
        self.search_one(PersonQuery::by_id(id))
            .await?
            .ok_or_else(|| GraphError::NotFound { id: id.0.clone() })
    }
}

#[async_trait]
impl PersonStore for GraphClient {
    async fn get(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        self.search_one(PersonQuery::by_id(id)).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Person>, GraphError> {
        self.search(&PersonQuery::by_name(name)).await
    }

    async fn list(&self) -> Result<Vec<Person>, GraphError> {
        self.search(&PersonQuery::all()).await
    }

    async fn children(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        self.search_one(PersonQuery::children(id)).await
    }

    async fn father(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        self.search_one(PersonQuery::father(id)).await
    }

    async fn mother(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        self.search_one(PersonQuery::mother(id)).await
    }

    async fn partners(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        self.search_one(PersonQuery::partners(id)).await
    }

    async fn create(&self, person: &Person) -> Result<Person, GraphError> {
        let plan = WritePlan::create(person);
        let id = self.create_or_update(&plan).await?;
        self.fetch_written(&id).await
    }

    async fn update(&self, id: &PersonId, patch: &Person) -> Result<Person, GraphError> {
        if !self.exists(id).await? {
            return Err(GraphError::NotFound { id: id.0.clone() });
        }
        let plan = WritePlan::update(id, patch);
        self.create_or_update(&plan).await?;
        self.fetch_written(id).await
    }

    async fn delete(&self, id: &PersonId) -> Result<i64, GraphError> {
        self.delete_person(id).await
    }

    async fn network(&self) -> Result<Network, GraphError> {
        let sets = self.network_export(&NetworkQuery::all()).await?;
        Ok(Network::from_sets(sets))
    }

    async fn person_network(&self, id: &PersonId) -> Result<Network, GraphError> {
        let sets = self.network_export(&NetworkQuery::person(id)).await?;
        Ok(Network::from_sets(sets))
    }
}

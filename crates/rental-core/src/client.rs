use crate::error::{RentalError, RentalResult};
use crate::ids::ClientId;
use crate::storage::Store;
use crate::types::{Client, ClientDraft};
use std::sync::Arc;
use tracing::info;

/// Client registration with license and identity uniqueness.
pub struct ClientRegistry {
    store: Arc<dyn Store>,
}

impl ClientRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, draft: ClientDraft) -> RentalResult<Client> {
        draft.validate()?;
        self.ensure_unique(&draft, None).await?;

        let client = self.store.insert_client(draft).await?;
        info!(client_id = %client.id, "Client registered");
        Ok(client)
    }

    pub async fn update(&self, id: ClientId, draft: ClientDraft) -> RentalResult<Client> {
        draft.validate()?;
        self.get(id).await?;
        self.ensure_unique(&draft, Some(id)).await?;

        let client = draft.into_client(id);
        self.store.update_client(client.clone()).await?;
        info!(client_id = %id, "Client updated");
        Ok(client)
    }

    /// Remove a client no contract refers to.
    ///
    /// The store re-checks references as part of the delete, so a contract booked
    /// after the check below still blocks it.
    pub async fn delete(&self, id: ClientId) -> RentalResult<()> {
        self.get(id).await?;
        if self.store.client_has_contracts(id).await? {
            return Err(RentalError::Conflict(format!(
                "{} is referenced by contracts",
                id
            )));
        }
        if !self.store.delete_client(id).await? {
            return Err(RentalError::not_found(id));
        }
        info!(client_id = %id, "Client deleted");
        Ok(())
    }

    pub async fn get(&self, id: ClientId) -> RentalResult<Client> {
        self.store
            .get_client(id)
            .await?
            .ok_or_else(|| RentalError::not_found(id))
    }

    pub async fn list(&self) -> RentalResult<Vec<Client>> {
        Ok(self.store.list_clients().await?)
    }

    async fn ensure_unique(&self, draft: &ClientDraft, excluding: Option<ClientId>) -> RentalResult<()> {
        if self
            .store
            .license_exists(&draft.license_number, excluding)
            .await?
        {
            return Err(RentalError::Conflict(format!(
                "license number {} already registered",
                draft.license_number
            )));
        }
        if self
            .store
            .identity_exists(
                &draft.last_name,
                &draft.first_name,
                draft.birth_date,
                excluding,
            )
            .await?
        {
            return Err(RentalError::Conflict(format!(
                "client {} {} born {} already registered",
                draft.first_name, draft.last_name, draft.birth_date
            )));
        }
        Ok(())
    }
}

use std::fmt::Debug;

use log::*;

use crate::{
    mpe_api::errors::AddressImportError,
    traits::{ChainClient, ChainClientError, RescanPolicy},
};

/// Registers receiving addresses with a chain node by importing their viewing keys.
pub struct AddressApi<C> {
    chain: C,
}

impl<C> Debug for AddressApi<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AddressApi")
    }
}

impl From<ChainClientError> for AddressImportError {
    fn from(e: ChainClientError) -> Self {
        match e {
            e if e.is_invalid_address_or_key() => match e {
                ChainClientError::Rpc { message, .. } => AddressImportError::InvalidViewingKey(message),
                other => AddressImportError::InvalidViewingKey(other.to_string()),
            },
            ChainClientError::Rpc { code, message } => AddressImportError::NodeError { code, message },
            ChainClientError::Transport(msg) => AddressImportError::NodeUnavailable(msg),
            ChainClientError::InvalidResponse(msg) => AddressImportError::InvalidResponse(msg),
        }
    }
}

impl<C> AddressApi<C>
where C: ChainClient
{
    pub fn new(chain: C) -> Self {
        Self { chain }
    }

    pub async fn import_viewing_key(
        &self,
        viewing_key: &str,
        rescan: RescanPolicy,
        start_height: Option<u64>,
    ) -> Result<(), AddressImportError> {
        let key = viewing_key.trim();
        if key.is_empty() {
            return Err(AddressImportError::InvalidViewingKey("The viewing key is empty".into()));
        }
        match self.chain.import_viewing_key(key, rescan, start_height).await {
            Ok(()) => {
                info!("🔑️ Viewing key imported (rescan: {rescan})");
                Ok(())
            },
            Err(e) => {
                warn!("🔑️ Viewing key import failed. {e}");
                Err(e.into())
            },
        }
    }
}

#[cfg(test)]
mod test {
    use mockall::{mock, predicate::eq};

    use super::*;
    use crate::db_types::ReceivedTransaction;

    mock! {
        pub Node {}
        impl ChainClient for Node {
            async fn received_by_address(
                &self,
                address: &str,
                min_confirmations: u32,
            ) -> Result<Vec<ReceivedTransaction>, ChainClientError>;
            async fn import_viewing_key(
                &self,
                viewing_key: &str,
                rescan: RescanPolicy,
                start_height: Option<u64>,
            ) -> Result<(), ChainClientError>;
        }
    }

    fn failing(err: ChainClientError) -> AddressApi<MockNode> {
        let mut node = MockNode::new();
        node.expect_import_viewing_key().returning(move |_, _, _| Err(err.clone()));
        AddressApi::new(node)
    }

    #[tokio::test]
    async fn import_success() {
        let mut node = MockNode::new();
        node.expect_import_viewing_key()
            .with(eq("zxviews1abc"), eq(RescanPolicy::No), eq(Some(1_000)))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let api = AddressApi::new(node);
        api.import_viewing_key(" zxviews1abc ", RescanPolicy::No, Some(1_000)).await.unwrap();
    }

    #[tokio::test]
    async fn errors_are_mapped_for_the_caller() {
        let rpc = |code, msg: &str| ChainClientError::Rpc { code, message: msg.to_string() };
        let err = failing(rpc(-5, "Invalid viewing key")).import_viewing_key("k", RescanPolicy::Yes, None).await;
        assert_eq!(err, Err(AddressImportError::InvalidViewingKey("Invalid viewing key".into())));
        let err = failing(rpc(-28, "Loading block index")).import_viewing_key("k", RescanPolicy::Yes, None).await;
        assert_eq!(err, Err(AddressImportError::NodeError { code: -28, message: "Loading block index".into() }));
        let err = failing(ChainClientError::Transport("timed out".into()))
            .import_viewing_key("k", RescanPolicy::Yes, None)
            .await;
        assert_eq!(err, Err(AddressImportError::NodeUnavailable("timed out".into())));
        let mut node = MockNode::new();
        node.expect_import_viewing_key().never();
        let err = AddressApi::new(node).import_viewing_key("  ", RescanPolicy::Yes, None).await;
        assert!(matches!(err, Err(AddressImportError::InvalidViewingKey(_))));
    }
}

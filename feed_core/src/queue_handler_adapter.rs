//! C5: queue-handler adapter. Thin wrapper over an external `QueueHandler`
//! that additionally subscribes and merges the derived auxiliary
//! (split/dividend) streams for non-internal equity configurations.

use std::sync::Arc;

use crate::data_model::{SecurityType, SubscriptionConfiguration};
use crate::error::ProducerError;
use crate::external::{NewDataNotifier, QueueHandler};
use crate::point_source::BoxedSource;
use crate::transformers::AuxiliarySync;

pub struct QueueHandlerAdapter<Q: QueueHandler> {
    handler: Arc<Q>,
}

impl<Q: QueueHandler> QueueHandlerAdapter<Q> {
    pub fn new(handler: Arc<Q>) -> Self {
        QueueHandlerAdapter { handler }
    }

    /// Subscribes the primary configuration and, for non-internal equity
    /// feeds, the derived auxiliary configuration,
    /// returning a single merged source ordered as `AuxiliarySync` demands.
    pub async fn subscribe(
        &self,
        config: &SubscriptionConfiguration,
        notifier: NewDataNotifier,
    ) -> Result<BoxedSource, ProducerError> {
        let main = self.handler.subscribe(config, notifier.clone()).await?;

        let auxiliary_configs = config.auxiliary_configs();
        if auxiliary_configs.is_empty() {
            return Ok(main);
        }

        let mut aux_sources = Vec::with_capacity(auxiliary_configs.len());
        for aux_config in &auxiliary_configs {
            aux_sources.push(self.handler.subscribe(aux_config, notifier.clone()).await?);
        }
        Ok(Box::new(AuxiliarySync::new(main, aux_sources)))
    }

    pub async fn unsubscribe(&self, config: &SubscriptionConfiguration) {
        self.handler.unsubscribe(config).await;
        for aux_config in config.auxiliary_configs() {
            self.handler.unsubscribe(&aux_config).await;
        }
    }

    /// Construction fails with `UnsupportedSecurityType` if the producer
    /// lacks the universe-provider capability for a requested security type.
    pub fn universe_capable(&self, security_type: SecurityType) -> bool {
        self.handler.universe_for(security_type).is_some()
    }

    pub fn handler(&self) -> &Arc<Q> {
        &self.handler
    }
}

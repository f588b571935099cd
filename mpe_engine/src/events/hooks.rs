use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, MarketStateChangedEvent, PaymentStatusChangedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_status_changed_producer: Vec<EventProducer<PaymentStatusChangedEvent>>,
    pub market_state_changed_producer: Vec<EventProducer<MarketStateChangedEvent>>,
}

impl EventProducers {
    pub async fn publish_payment_status_changed(&self, event: PaymentStatusChangedEvent) {
        for emitter in &self.payment_status_changed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_market_state_changed(&self, event: MarketStateChangedEvent) {
        for emitter in &self.market_state_changed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_payment_status_changed: Option<EventHandler<PaymentStatusChangedEvent>>,
    pub on_market_state_changed: Option<EventHandler<MarketStateChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_status_changed = hooks.on_payment_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_market_state_changed = hooks.on_market_state_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_status_changed, on_market_state_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_status_changed {
            result.payment_status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_market_state_changed {
            result.market_state_changed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_market_state_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_status_changed: Option<Handler<PaymentStatusChangedEvent>>,
    pub on_market_state_changed: Option<Handler<MarketStateChangedEvent>>,
}

impl EventHooks {
    pub fn on_payment_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_market_state_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(MarketStateChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_market_state_changed = Some(Arc::new(f));
        self
    }
}

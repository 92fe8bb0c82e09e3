use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{DispatchFailedEvent, EventHandler, EventProducer, Handler, OrderDispatchedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_dispatched_producer: Vec<EventProducer<OrderDispatchedEvent>>,
    pub dispatch_failed_producer: Vec<EventProducer<DispatchFailedEvent>>,
}

pub struct EventHandlers {
    pub on_order_dispatched: Option<EventHandler<OrderDispatchedEvent>>,
    pub on_dispatch_failed: Option<EventHandler<DispatchFailedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_dispatched = hooks.on_order_dispatched.map(|f| EventHandler::new(buffer_size, f));
        let on_dispatch_failed = hooks.on_dispatch_failed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_dispatched, on_dispatch_failed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_dispatched {
            result.order_dispatched_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_dispatch_failed {
            result.dispatch_failed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_dispatched {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_dispatch_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

/// The set of hooks an installation wants to run. The server builds one of these at startup (email and SMS
/// notifiers live there); the engine only ever publishes through the producers.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_dispatched: Option<Handler<OrderDispatchedEvent>>,
    pub on_dispatch_failed: Option<Handler<DispatchFailedEvent>>,
}

impl EventHooks {
    pub fn on_order_dispatched<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderDispatchedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_dispatched = Some(Arc::new(f));
        self
    }

    pub fn on_dispatch_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DispatchFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_dispatch_failed = Some(Arc::new(f));
        self
    }
}

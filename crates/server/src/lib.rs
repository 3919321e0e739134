//! Service assembly: concrete controllers plus the router wiring.

use std::sync::Arc;

use axum::Router;

use fluxgate_broker::{EventPublisher, IngestGateway, OffsetController, OffsetStore};
use fluxgate_catalog::{Catalog, Reconciler};
use fluxgate_modifier_store::ModifierStore;
use fluxgate_rest_api::{
    IngestState, ModifierState, ReplayState, SchemaState,
};

pub mod api;

use api::{IngestApi, ModifierApi, ReplayApi, SchemaApi};

/// Wire the full router from the domain components. Shared between the
/// binary and the integration tests, which plug in in-memory backends.
pub fn build_router(
    publisher: Arc<dyn EventPublisher>,
    store: Arc<dyn ModifierStore>,
    catalog: Arc<dyn Catalog>,
    offsets: Arc<dyn OffsetStore>,
) -> Router {
    let reconciler = Arc::new(Reconciler::new(store.clone(), catalog));

    fluxgate_rest_api::router(
        IngestState {
            gateway: Arc::new(IngestApi::new(IngestGateway::new(publisher))),
        },
        ModifierState {
            controller: Arc::new(ModifierApi::new(store)),
        },
        SchemaState {
            controller: Arc::new(SchemaApi::new(reconciler)),
        },
        ReplayState {
            controller: Arc::new(ReplayApi::new(OffsetController::new(
                offsets,
            ))),
        },
    )
}

//! One lazily mounted tour per catalog route.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::catalog;
use super::controller::{TourController, TourDeps};
use super::step::DeviceClass;
use crate::config::TourConfig;
use crate::error::TourError;
use crate::identity::DeploymentIdentity;
use crate::store::ProgressScope;

/// Product settings a service needs to build scopes and catalogs.
#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub product: String,
    pub callsign: String,
    pub theme: String,
}

impl From<&TourConfig> for ProductInfo {
    fn from(config: &TourConfig) -> Self {
        Self {
            product: config.product.clone(),
            callsign: config.callsign.clone(),
            theme: config.theme.clone(),
        }
    }
}

/// Catalog routes → mounted tours. A route whose catalog is empty maps to
/// `None`.
pub struct TourService {
    product: ProductInfo,
    identity: Arc<dyn DeploymentIdentity>,
    deployment: RwLock<Option<String>>,
    deps: TourDeps,
    tours: RwLock<HashMap<String, Option<Arc<TourController>>>>,
}

impl TourService {
    pub fn new(product: ProductInfo, identity: Arc<dyn DeploymentIdentity>, deps: TourDeps) -> Arc<Self> {
        Arc::new(Self {
            product,
            identity,
            deployment: RwLock::new(None),
            deps,
            tours: RwLock::new(HashMap::new()),
        })
    }

    /// Deployment id, fetched once it is known. An empty answer is not
    /// cached so a later mount can pick up the real identity.
    async fn deployment_id(&self) -> String {
        if let Some(id) = self.deployment.read().await.as_ref() {
            return id.clone();
        }

        let id = self.identity.deployment().await;
        if id.is_empty() {
            warn!("Deployment identity unknown, onboarding progress will not persist");
        } else {
            *self.deployment.write().await = Some(id.clone());
        }
        id
    }

    /// The tour for `route`, mounting it on first use.
    ///
    /// Routes without their own catalog entry share the home tour, so the
    /// number of mounted tours is bounded by the catalog. A tour mounted
    /// before the deployment identity was known is remounted, with its stored
    /// progress, as soon as the identity resolves.
    pub async fn tour(&self, route: &str, device: DeviceClass) -> Result<Arc<TourController>, TourError> {
        let route = catalog::route_key(route);
        let cached = self.tours.read().await.get(route).cloned();

        match cached {
            Some(Some(tour)) if !tour.scope().is_resolved() => {
                let deployment_id = self.deployment_id().await;
                if deployment_id.is_empty() {
                    return Ok(tour);
                }
                let device = tour.snapshot().await.device;
                info!(route = %route, "Deployment identity resolved, reloading tour progress");
                self.mount(route, deployment_id, device, Some(&tour)).await
            }
            Some(entry) => entry.ok_or_else(|| no_steps(route)),
            None => {
                let deployment_id = self.deployment_id().await;
                self.mount(route, deployment_id, device, None).await
            }
        }
    }

    /// Mount (or replace `stale` with) the tour for a catalog route.
    async fn mount(
        &self,
        route: &'static str,
        deployment_id: String,
        device: DeviceClass,
        stale: Option<&Arc<TourController>>,
    ) -> Result<Arc<TourController>, TourError> {
        let mut tours = self.tours.write().await;
        // Another request may have mounted it while we resolved the identity
        if let Some(entry) = tours.get(route) {
            let replacing = matches!(
                (entry, stale),
                (Some(current), Some(stale)) if Arc::ptr_eq(current, stale)
            );
            if !replacing {
                return entry.clone().ok_or_else(|| no_steps(route));
            }
        }

        let scope = ProgressScope {
            deployment_id,
            product: self.product.product.clone(),
            callsign: self.product.callsign.clone(),
            route: route.to_string(),
        };
        let steps = catalog::steps_for(route, &self.product.theme);

        let controller = TourController::mount(scope, steps, device, self.deps.clone()).await;
        info!(route = %route, mounted = controller.is_some(), "Tour registered");
        tours.insert(route.to_string(), controller.clone());
        controller.ok_or_else(|| no_steps(route))
    }

    /// Number of catalog routes mounted so far.
    pub async fn route_count(&self) -> usize {
        self.tours.read().await.len()
    }
}

fn no_steps(route: &str) -> TourError {
    TourError::EmptyStepList {
        route: route.to_string(),
    }
}

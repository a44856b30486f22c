use transfer_watch_domain::services::telemetry::TelemetryGuard;
use transfer_watch_domain::storage::TransactionStore;
use transfer_watch_monitor::{MonitorServices, MonitorSettings, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    services: MonitorServices,
    settings: MonitorSettings,
    registry: SessionRegistry,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(
        services: MonitorServices,
        settings: MonitorSettings,
        registry: SessionRegistry,
        telemetry: TelemetryGuard,
    ) -> Self {
        Self {
            services,
            settings,
            registry,
            telemetry,
        }
    }

    pub fn services(&self) -> &MonitorServices {
        &self.services
    }

    pub fn storage(&self) -> &dyn TransactionStore {
        self.services.store()
    }

    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}

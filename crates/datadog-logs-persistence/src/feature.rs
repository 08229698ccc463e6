// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wiring of the persistence service and the upload loop.
//!
//! [`LogsFeature`] is the explicit context object shared by producers and the
//! uploader. Nothing here is global: several features can run side by side as
//! long as they use distinct directories.

use crate::config::Config;
use crate::context::{AppContext, NetworkConnectionInfoProvider};
use crate::error::StartError;
use crate::logs::{LogBuilder, LogStatus};
use crate::persistence::directory::Directory;
use crate::persistence::orchestrator::{FilesOrchestrator, ReadConditions, WriteConditions};
use crate::persistence::service::{PersistenceHandle, PersistenceService};
use crate::persistence::writer::{EventWriter, FileWriter};
use crate::time::{DateProvider, SystemDateProvider};
use crate::upload::delay::UploadDelay;
use crate::upload::http_client::{HttpClient, ReqwestHttpClient};
use crate::upload::request::{DataUploadUrl, HttpHeaders};
use crate::upload::strategy::UploadStrategy;
use crate::upload::uploader::DataUploader;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

#[allow(clippy::module_name_repetitions)]
pub struct LogsFeatureBuilder {
    config: Config,
    directory: PathBuf,
    endpoint_url: String,
    client_token: String,
    app_context: AppContext,
    date_provider: Arc<dyn DateProvider>,
    http_client: Option<Arc<dyn HttpClient>>,
    network_info_provider: Option<Arc<dyn NetworkConnectionInfoProvider>>,
}

impl LogsFeatureBuilder {
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn app_context(mut self, app_context: AppContext) -> Self {
        self.app_context = app_context;
        self
    }

    #[must_use]
    pub fn date_provider(mut self, date_provider: Arc<dyn DateProvider>) -> Self {
        self.date_provider = date_provider;
        self
    }

    /// Replaces the default reqwest transport.
    #[must_use]
    pub fn http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    #[must_use]
    pub fn network_info_provider(
        mut self,
        provider: Arc<dyn NetworkConnectionInfoProvider>,
    ) -> Self {
        self.network_info_provider = Some(provider);
        self
    }

    /// Validates the setup, starts the persistence thread and spawns the
    /// upload loop on the current tokio runtime.
    pub fn start(self) -> Result<LogsFeature, StartError> {
        self.config.validate()?;
        let url = DataUploadUrl::new(&self.endpoint_url, &self.client_token)?;

        let persistence = &self.config.persistence;
        let orchestrator = FilesOrchestrator::new(
            Directory::new(&self.directory)?,
            WriteConditions::from(persistence),
            ReadConditions::from(persistence),
            Arc::clone(&self.date_provider),
        );
        let (service, handle) = PersistenceService::new(
            FileWriter::new(orchestrator, persistence.max_write_size),
            persistence.write_queue_capacity,
        );
        let http_client: Arc<dyn HttpClient> = match self.http_client {
            Some(http_client) => http_client,
            None => Arc::new(ReqwestHttpClient::new(&self.config.upload)?),
        };
        let persistence_thread = service.spawn()?;

        let uploader = DataUploader::new(url, HttpHeaders::new(&self.app_context), http_client);
        let strategy = UploadStrategy::new(
            handle.clone(),
            uploader,
            UploadDelay::from_config(&self.config.upload),
        );

        let cancel_token = CancellationToken::new();
        let upload_task = tokio::spawn(strategy.run(cancel_token.clone()));
        debug!(
            "PERSISTENCE | Logs feature started in {}",
            self.directory.display()
        );

        Ok(LogsFeature {
            writer: EventWriter::new(handle.clone()),
            handle,
            app_context: self.app_context,
            date_provider: self.date_provider,
            network_info_provider: self.network_info_provider,
            cancel_token,
            upload_task,
            persistence_thread: Some(persistence_thread),
        })
    }
}

#[allow(clippy::module_name_repetitions)]
pub struct LogsFeature {
    writer: EventWriter,
    handle: PersistenceHandle,
    app_context: AppContext,
    date_provider: Arc<dyn DateProvider>,
    network_info_provider: Option<Arc<dyn NetworkConnectionInfoProvider>>,
    cancel_token: CancellationToken,
    upload_task: JoinHandle<()>,
    persistence_thread: Option<thread::JoinHandle<()>>,
}

impl LogsFeature {
    pub fn builder(
        directory: impl Into<PathBuf>,
        endpoint_url: impl Into<String>,
        client_token: impl Into<String>,
    ) -> LogsFeatureBuilder {
        LogsFeatureBuilder {
            config: Config::default(),
            directory: directory.into(),
            endpoint_url: endpoint_url.into(),
            client_token: client_token.into(),
            app_context: AppContext::default(),
            date_provider: Arc::new(SystemDateProvider),
            http_client: None,
            network_info_provider: None,
        }
    }

    /// Entry point for arbitrary serializable events.
    pub fn writer(&self) -> EventWriter {
        self.writer.clone()
    }

    pub fn handle(&self) -> &PersistenceHandle {
        &self.handle
    }

    pub fn logger(&self, service: impl Into<String>, logger_name: impl Into<String>) -> Logger {
        let mut builder = LogBuilder::new(
            service,
            logger_name,
            self.app_context.clone(),
            Arc::clone(&self.date_provider),
        );
        if let Some(provider) = &self.network_info_provider {
            builder = builder.with_network_info_provider(Arc::clone(provider));
        }
        Logger {
            builder,
            writer: self.writer.clone(),
        }
    }

    /// Stops the upload loop, then lets the persistence thread finish every
    /// write queued before this call.
    ///
    /// Batches left on disk are picked up by the next feature started on the
    /// same directory.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Err(e) = (&mut self.upload_task).await {
            error!("UPLOAD | Upload loop ended abnormally: {}", e);
        }

        if let Err(e) = self.handle.shutdown().await {
            debug!("PERSISTENCE | {}", e);
        }
        if let Some(thread) = self.persistence_thread.take() {
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => debug!("PERSISTENCE | Logs feature stopped"),
                Ok(Err(_)) => error!("PERSISTENCE | Persistence thread panicked"),
                Err(e) => error!("PERSISTENCE | Unable to join persistence thread: {}", e),
            }
        }
    }
}

/// Creates [`crate::logs::Log`] events and queues them for persistence.
#[derive(Debug, Clone)]
pub struct Logger {
    builder: LogBuilder,
    writer: EventWriter,
}

impl Logger {
    pub fn log(&self, status: LogStatus, message: impl Into<String>) {
        self.writer.write(self.builder.create(status, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogStatus::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogStatus::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogStatus::Error, message);
    }
}

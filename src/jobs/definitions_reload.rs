use std::path::Path;

use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::app_context::{AppContext, SyncReport};
use crate::definitions::load_definitions;

async fn apply_definitions_from_path(
    app_context: &AppContext,
    definitions_path: &str,
) -> Result<SyncReport, String> {
    let definitions = load_definitions(definitions_path).map_err(|error| error.to_string())?;
    Ok(app_context.sync_definitions(definitions).await)
}

/// Loads the definitions file once. Returns an error when the file cannot be used.
pub async fn load_initial_definitions(app_context: &AppContext) -> Result<SyncReport, String> {
    let report = apply_definitions_from_path(app_context, &app_context.definitions_path).await?;
    log::info!(
        "definitions_loaded path={} applied={} failed={}",
        app_context.definitions_path,
        report.applied,
        report.failed
    );
    Ok(report)
}

pub(super) fn start_definitions_hot_reload_job(app_context: AppContext) {
    tokio::spawn(async move {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let definitions_path = app_context.definitions_path.clone();
        let mut watcher = match RecommendedWatcher::new(
            move |result| {
                let _ = tx.send(result);
            },
            NotifyConfig::default(),
        ) {
            Ok(watcher) => watcher,
            Err(error) => {
                log::warn!("definitions hot-reload disabled: watcher init failed: {}", error);
                return;
            }
        };

        if let Err(error) =
            watcher.watch(Path::new(definitions_path.as_str()), RecursiveMode::NonRecursive)
        {
            log::warn!(
                "definitions hot-reload disabled: failed to watch {}: {}",
                definitions_path,
                error
            );
            return;
        }

        while let Some(event_result) = rx.recv().await {
            let event = match event_result {
                Ok(event) => event,
                Err(error) => {
                    log::warn!("definitions hot-reload event error: {}", error);
                    continue;
                }
            };

            let should_reload = matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
            );
            if !should_reload {
                continue;
            }

            match apply_definitions_from_path(&app_context, definitions_path.as_str()).await {
                Ok(report) => {
                    log::info!(
                        "definitions_hot_reload_applied path={} applied={} failed={} metrics={}",
                        definitions_path,
                        report.applied,
                        report.failed,
                        app_context.scheduler.len().await,
                    );
                }
                Err(error) => {
                    log::warn!("definitions hot-reload ignored invalid file: {}", error);
                }
            }
        }
    });
}

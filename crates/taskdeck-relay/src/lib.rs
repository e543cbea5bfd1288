pub mod cli;
pub mod config;
pub mod html;
pub mod routes;
pub mod state;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use taskdeck_auth::{
  AuthConfig,
  AuthError,
  AuthFacade,
  FileTokenStore
};
use taskdeck_core::config::{
  Config,
  resolve_data_dir
};
use tokio::signal;
use tracing::{
  debug,
  info,
  warn
};

pub use crate::config::RelayConfig;
pub use crate::routes::create_router;
pub use crate::state::AppState;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::RelayCli::parse_from(raw_args);

  taskdeck_core::logging::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  let mut cfg =
    Config::load(cli.config.as_deref())?;
  cfg.apply_overrides(cli.overrides());

  let relay = RelayConfig::from_config(
    &cfg
  )?;
  let auth = build_auth(
    &cfg,
    cli.data.as_deref()
  )?;

  let runtime =
    tokio::runtime::Builder::new_multi_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  runtime.block_on(serve(
    AppState::new(relay, auth)
  ))
}

/// The auth facade when an OAuth client
/// is configured; tokens live in the
/// data directory.
fn build_auth(
  cfg: &Config,
  data_override: Option<&std::path::Path>
) -> anyhow::Result<Option<AuthFacade>> {
  let auth_cfg =
    match AuthConfig::from_config(cfg) {
      | Ok(auth_cfg) => auth_cfg,
      | Err(AuthError::MissingConfig(
        key
      )) => {
        warn!(
          missing = key,
          "OAuth client not configured; \
           /auth/start disabled"
        );
        return Ok(None);
      }
      | Err(err) => {
        return Err(err).context(
          "invalid auth configuration"
        );
      }
    };

  let data_dir =
    resolve_data_dir(cfg, data_override)
      .context(
        "failed to resolve data \
         directory"
      )?;
  let store = Arc::new(
    FileTokenStore::in_dir(&data_dir)
  );
  debug!(tokens = %store.path().display(), "using token file");

  let facade =
    AuthFacade::new(auth_cfg, store)
      .context(
        "failed to build auth client"
      )?;
  Ok(Some(facade))
}

/// Binds the configured address and
/// serves until SIGINT or SIGTERM.
#[tracing::instrument(skip_all)]
pub async fn serve(
  state: AppState
) -> anyhow::Result<()> {
  let listener =
    state.config.bind().await?;
  let addr = listener
    .local_addr()
    .context(
      "failed to read listen address"
    )?;
  let forward_url =
    state.config.forward_url.clone();

  info!(
    %addr,
    %forward_url,
    "callback relay listening on \
     http://{addr}/callback"
  );

  axum::serve(
    listener,
    create_router(state)
  )
  .with_graceful_shutdown(
    shutdown_signal()
  )
  .await
  .context("relay server failed")?;

  info!("callback relay stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(err) =
      signal::ctrl_c().await
    {
      warn!(error = %err, "failed to install Ctrl+C handler");
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(
      signal::unix::SignalKind::terminate()
    ) {
      | Ok(mut sig) => {
        sig.recv().await;
      }
      | Err(err) => {
        warn!(error = %err, "failed to install SIGTERM handler");
        std::future::pending::<()>()
          .await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate =
    std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => {
      info!("received Ctrl+C, shutting down");
    }
    () = terminate => {
      info!("received SIGTERM, shutting down");
    }
  }
}

//!
//! src/main.rs
//! 
//! Entry point of the vinyl track catalogue: loads configuration,
//! starts logging, opens the track store and hands it to the shell
//!

mod config; 
mod controller;
mod errors; 
mod form;
mod ids;
mod logging; 
mod persistent; 
mod schema;
mod shell;
mod types;

use crate::errors::CatalogError;

fn main() -> Result<(), CatalogError> {
    let cfgs     = config::load_config()?;
    let _logging = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service = "vinyl-catalog", 
        version = %env!("CARGO_PKG_VERSION"), 
        path = %cfgs.catalog.path.display(),
        ids = cfgs.catalog.id_strategy.as_str(),
        "starting"
    );

    let store = persistent::TrackStore::init(
        &cfgs.catalog,
        Box::new(ids::SystemClock),
        ids::generator_for(cfgs.catalog.id_strategy),
    );
    let store = match store {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "store.open.failed");
            eprintln!("cannot open the track store: {e}");
            return Err(e);
        }
    };

    tracing::info!(
        path = %store.path().display(),
        count = store.len(),
        schema = store.loaded_schema().as_str(),
        "store.ready"
    );

    let controller = controller::AppController::new(store);
    let stdin  = std::io::stdin();
    let stdout = std::io::stdout();
    let mut shell = shell::Shell::new(
        controller,
        stdin.lock(),
        stdout.lock(),
        cfgs.catalog.sort,
    );
    shell.run()?;

    tracing::info!("exit");
    Ok(())
}

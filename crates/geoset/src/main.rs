//! Geoset CLI - geospatial imagery dataset producer
//!
//! Binary name: `geoset`

use std::process;

use geoset::cli::{build_cli, handlers};

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    if let Err(e) = handlers::init_tracing(matches.get_flag("verbose")) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Warning: {e}");
        }
    }

    if let Err(err) = handlers::dispatch(&matches).await {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {}", handlers::format_error(&err));
        }

        let code = err
            .downcast_ref::<geoset_core::Error>()
            .map_or(1, geoset_core::Error::exit_code);

        #[allow(clippy::exit)]
        process::exit(code);
    }
}

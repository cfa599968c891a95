//! Config handling

use tracing::log::LevelFilter;

/// Modules that are chatty at debug level and get capped unless debugging.
const NOISY_MODULES: [(&str, LevelFilter); 6] = [
    ("tracing", LevelFilter::Warn),
    ("rustls", LevelFilter::Info),
    ("hyper_util", LevelFilter::Info),
    ("h2", LevelFilter::Info),
    ("sqlx", LevelFilter::Warn),
    ("sea_orm_migration", LevelFilter::Warn),
];

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        for (module, module_level) in NOISY_MODULES {
            logger = logger.with_module_level(module, module_level);
        }
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::COMPLETIONS_URL;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "ALTGEN_DEBUG")]
    /// Enable debug logging. Env: ALTGEN_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "ALTGEN_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: ALTGEN_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "ALTGEN_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: ALTGEN_LISTEN_ADDRESS
    pub listen_address: String,
    #[clap(
        long,
        default_value = "http://localhost:9000/",
        env = "ALTGEN_PUBLIC_URL"
    )]
    /// Externally reachable base URL, attachment URLs sent to the model are built from it.
    /// Env: ALTGEN_PUBLIC_URL
    pub public_url: url::Url,

    #[clap(long, default_value = "altgen.sqlite", env = "ALTGEN_DATABASE_PATH")]
    /// Path to the database file, eg `/data/altgen.sqlite`.
    /// Env: ALTGEN_DATABASE_PATH
    pub database_path: String,

    #[clap(long, default_value = "./uploads", env = "ALTGEN_UPLOAD_DIR")]
    /// Where uploaded images are stored.
    /// Env: ALTGEN_UPLOAD_DIR
    pub upload_dir: PathBuf,

    #[clap(long, default_value = COMPLETIONS_URL, env = "ALTGEN_COMPLETIONS_URL")]
    /// Chat-completions endpoint.
    /// Env: ALTGEN_COMPLETIONS_URL
    pub completions_url: url::Url,
}

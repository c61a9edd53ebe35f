use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use libris_http::Environment;

#[derive(Clone, Debug, Parser)]
#[command(
    name = "libris",
    version = env!("CARGO_PKG_VERSION"),
    about,
    long_about = None,
    propagate_version = true
)]
pub struct App {
    /// Backend environment (development, production, test).
    #[arg(long, global = true)]
    pub env: Option<Environment>,

    /// Base URL overriding the environment's.
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// TOML client configuration.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Sign in and remember the session.
    Login(LoginArg),
    /// Sign out and forget the session.
    Logout,

    #[command(alias = "c", name = "courses")]
    Courses,
    #[command(alias = "b", name = "books")]
    Books(BooksArg),
    #[command(alias = "n", name = "notices")]
    Notices,
    #[command(alias = "r", name = "resources")]
    Resources,

    /// Look a student up by library ID.
    #[command(alias = "s", name = "student")]
    Student(StudentArg),
    /// Generate a library clearance certificate.
    Noc(NocArg),
}

#[derive(Args, Clone, Debug)]
pub struct LoginArg {
    #[arg(long, short)]
    pub email: String,
    #[arg(long, short)]
    pub password: String,
}

#[derive(Args, Clone, Debug)]
pub struct BooksArg {
    #[arg(long, short)]
    pub page: Option<u32>,
    #[arg(long, short)]
    pub search: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct StudentArg {
    pub library_id: String,
}

#[derive(Args, Clone, Debug)]
pub struct NocArg {
    pub library_id: String,
    #[arg(long)]
    pub reason: String,
    #[arg(long)]
    pub remarks: String,
    /// Certificate date, YYYY-MM-DD.
    #[arg(long)]
    pub date: String,
    /// Where to write a PDF certificate.
    #[arg(long, short, default_value = "noc.pdf")]
    pub out: PathBuf,
}

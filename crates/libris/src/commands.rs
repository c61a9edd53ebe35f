use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use libris_api::{
    IssuedBook, LibraryApi, NocDetails, NocDocument, NocFlow, StudentLookup, User,
    outstanding_books,
};
use libris_http::{
    ClientConfig, FileSessionStore, LOGIN_ROUTE, Navigator, ReqwestTransport, RouteTracker, Session,
};
use tracing::debug;

use crate::cli::{App, BooksArg, Commands, LoginArg, NocArg, StudentArg};

const DATA_DIR: &str = ".libris";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";

pub async fn run(app: App) -> Result<()> {
    let dir = data_dir()?;
    let config = load_config(&app, &dir)?;
    debug!(environment = %config.environment, base_url = ?config.base_url, "client configured");

    let store = FileSessionStore::open(dir.join(SESSION_FILE))
        .with_context(|| format!("Failed to open session in {}", dir.display()))?;
    let session = Session::new(Arc::new(store));
    let navigator = Arc::new(RouteTracker::default());
    let api = LibraryApi::connect(config, session, navigator.clone())?;

    let result = dispatch(&api, app.cmd).await;
    if navigator.current_route() == LOGIN_ROUTE {
        eprintln!("Session expired. Run `libris login` to sign in again.");
    }
    result
}

async fn dispatch(api: &LibraryApi<ReqwestTransport>, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Login(arg) => login(api, arg).await,
        Commands::Logout => {
            if let Err(e) = api.logout().await {
                debug!(error = %e, "server-side logout failed");
            }
            println!("Signed out.");
            Ok(())
        }
        Commands::Courses => courses(api).await,
        Commands::Books(arg) => books(api, arg).await,
        Commands::Notices => notices(api).await,
        Commands::Resources => resources(api).await,
        Commands::Student(arg) => student(api, arg).await,
        Commands::Noc(arg) => noc(api, arg).await,
    }
}

fn data_dir() -> Result<PathBuf> {
    let home = home::home_dir().context("Failed to locate the home directory")?;
    Ok(home.join(DATA_DIR))
}

/// Defaults, then the config file, then `LIBRIS_*` variables, then flags.
fn load_config(app: &App, dir: &std::path::Path) -> Result<ClientConfig> {
    let mut config = match &app.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let path = dir.join(CONFIG_FILE);
            if path.is_file() {
                ClientConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            } else {
                ClientConfig::default()
            }
        }
    }
    .with_env_overrides()?;

    if let Some(env) = app.env {
        config = config.environment(env);
    }
    if let Some(url) = &app.api_url {
        config = config.base_url(url.clone());
    }
    Ok(config)
}

async fn login(api: &LibraryApi<ReqwestTransport>, arg: LoginArg) -> Result<()> {
    let login = api.login(&arg.email, &arg.password).await?;
    println!("Signed in as {}.", login.user.name);
    Ok(())
}

async fn courses(api: &LibraryApi<ReqwestTransport>) -> Result<()> {
    for course in api.get_courses().await? {
        match course.code {
            Some(code) => println!("{:>5}  {} [{code}]", course.id, course.name),
            None => println!("{:>5}  {}", course.id, course.name),
        }
    }
    Ok(())
}

async fn books(api: &LibraryApi<ReqwestTransport>, arg: BooksArg) -> Result<()> {
    let page = api.get_books(arg.page, arg.search.as_deref()).await?;
    for book in &page.data {
        let author = book.author.as_deref().unwrap_or("unknown author");
        let available = book
            .available
            .map(|n| format!(", {n} available"))
            .unwrap_or_default();
        println!("{:>5}  {} ({author}{available})", book.id, book.title);
    }
    println!("page {} of {}", page.current_page, page.last_page);
    Ok(())
}

async fn notices(api: &LibraryApi<ReqwestTransport>) -> Result<()> {
    for notice in api.get_notices().await? {
        let kind = notice.notification_type.as_deref().unwrap_or("general");
        print!("[{kind}] {}", notice.title);
        if let Some(expires) = &notice.expires_at {
            print!(" (until {expires})");
        }
        println!();
        if let Some(description) = notice.description.as_deref().filter(|d| !d.is_empty()) {
            println!("    {description}");
        }
    }
    Ok(())
}

async fn resources(api: &LibraryApi<ReqwestTransport>) -> Result<()> {
    let resources = api.get_resources().await?;
    let sections = [
        ("E-books", &resources.ebooks),
        ("Notes", &resources.notes),
        ("Question papers", &resources.question_papers),
    ];
    for (label, documents) in sections {
        println!("{label} ({})", documents.len());
        for document in documents {
            println!("{:>5}  {}", document.id, document.title);
        }
    }
    Ok(())
}

async fn student(api: &LibraryApi<ReqwestTransport>, arg: StudentArg) -> Result<()> {
    let (student, issued) = match api.find_student(&arg.library_id).await? {
        StudentLookup::NotFound => anyhow::bail!("No student with library ID {}", arg.library_id),
        StudentLookup::WithCirculation {
            student,
            issued_books,
        } => (student, issued_books),
        StudentLookup::StudentOnly(student) => {
            let issued = api.get_issued_books(&arg.library_id).await?;
            (student, issued)
        }
    };
    print_student(&student, &issued)
}

fn print_student(student: &User, issued: &[IssuedBook]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(student)?);
    let outstanding = outstanding_books(issued);
    println!(
        "{} issued, {} outstanding",
        issued.len(),
        outstanding.len()
    );
    for book in issued {
        let mark = if book.is_outstanding() { "*" } else { " " };
        let due = book.due_date.as_deref().unwrap_or("-");
        println!(" {mark} {}  due {due}", book.display_title());
    }
    Ok(())
}

async fn noc(api: &LibraryApi<ReqwestTransport>, arg: NocArg) -> Result<()> {
    let details = NocDetails {
        reason: arg.reason,
        remarks: arg.remarks,
        date: arg.date,
    };
    match NocFlow::new(api).run(&arg.library_id, details).await? {
        NocDocument::Pdf(bytes) => {
            tokio::fs::write(&arg.out, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", arg.out.display()))?;
            println!("NOC written to {}", arg.out.display());
        }
        NocDocument::Record(record) => {
            println!("NOC generated for {}", arg.library_id);
            if let Some(number) = record.certificate_number {
                println!("certificate: {number}");
            }
            if let Some(url) = record.download_url {
                println!("download: {url}");
            }
        }
    }
    Ok(())
}

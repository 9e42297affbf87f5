mod accounts;
mod aggregate;
mod catalog;
mod chart;
mod config;
mod countries;
mod dashboard;
mod database;
mod fields;
mod filter;
mod model;
mod search;
mod session;
mod templates;

use accounts::{AccountError, Accounts};
use actix_identity::{CookieIdentityPolicy, Identity, IdentityService};
use actix_web::{error, middleware::Logger, web, App, HttpResponse, HttpServer};
use catalog::Catalog;
use config::Config;
use dashboard::*;
use log::{debug, info};
use model::*;
use search::TitleIndex;
use serde::Deserialize;
use session::SessionContext;
use std::sync::Arc;

type Tera = web::Data<tera::Tera>;
type SharedCatalog = web::Data<Arc<Catalog>>;
type Index = web::Data<TitleIndex>;
type AccountStore = web::Data<Accounts>;
type QueryPairs = web::Query<Vec<(String, String)>>;

fn log_error<E: std::fmt::Debug>(err: E, message: &'static str) -> error::Error {
    debug!("{:?}", err);
    error::ErrorInternalServerError(message)
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().header("location", location).finish()
}

fn render(tera: &tera::Tera, template: &str, ctx: &tera::Context) -> actix_web::Result<HttpResponse> {
    let body = tera
        .render(template, ctx)
        .map_err(|err| log_error(err, "Template error"))?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

/// The logged-in account, or `None` if the visitor has to log in first.
fn current_user(
    id: &Identity,
    session: &SessionContext,
    accounts: &Accounts,
) -> actix_web::Result<Option<UserAccount>> {
    let username = match &session.username {
        Some(username) => username,
        None => return Ok(None),
    };
    let user = accounts
        .get(username)
        .map_err(|err| log_error(err, "Database error"))?;
    if user.is_none() {
        debug!("forgetting unknown user {}", username);
        id.forget();
    }
    Ok(user)
}

fn page_context(session: &SessionContext, user: &UserAccount, page: &str) -> tera::Context {
    let mut ctx = tera::Context::new();
    ctx.insert("user", &user.username);
    ctx.insert("current", page);
    ctx.insert("message", &session.selections.message);
    ctx
}

async fn index(
    id: Identity,
    query: QueryPairs,
    tera: Tera,
    catalog: SharedCatalog,
    title_index: Index,
    accounts: AccountStore,
) -> actix_web::Result<HttpResponse> {
    let session = SessionContext::new(&id, &query);
    let user = match current_user(&id, &session, &accounts)? {
        Some(user) => user,
        None => return Ok(redirect("/login")),
    };
    let search_results = match &session.selections.query {
        Some(q) => search_titles(&title_index, &catalog, q)
            .map_err(|err| log_error(err, "Search error"))?,
        None => Vec::new(),
    };
    let page = movies_page(&catalog, &session.selections, &user, search_results);
    let mut ctx = page_context(&session, &user, "movies");
    ctx.insert("page", &page);
    render(&tera, "index.html", &ctx)
}

async fn countries(
    id: Identity,
    query: QueryPairs,
    tera: Tera,
    catalog: SharedCatalog,
    accounts: AccountStore,
) -> actix_web::Result<HttpResponse> {
    let session = SessionContext::new(&id, &query);
    let user = match current_user(&id, &session, &accounts)? {
        Some(user) => user,
        None => return Ok(redirect("/login")),
    };
    let page = countries_page(&catalog, &session.selections, &mut rand::thread_rng());
    let mut ctx = page_context(&session, &user, "countries");
    ctx.insert("page", &page);
    render(&tera, "countries.html", &ctx)
}

async fn actors(
    id: Identity,
    query: QueryPairs,
    tera: Tera,
    catalog: SharedCatalog,
    accounts: AccountStore,
) -> actix_web::Result<HttpResponse> {
    let session = SessionContext::new(&id, &query);
    let user = match current_user(&id, &session, &accounts)? {
        Some(user) => user,
        None => return Ok(redirect("/login")),
    };
    let page = actors_page(&catalog, &session.selections);
    let mut ctx = page_context(&session, &user, "actors");
    ctx.insert("page", &page);
    render(&tera, "actors.html", &ctx)
}

#[derive(Deserialize)]
struct ListParams {
    title: String,
    list: ListKind,
    year: Option<i32>,
    genre: Option<String>,
}

async fn add_to_list(
    params: web::Form<ListParams>,
    id: Identity,
    accounts: AccountStore,
) -> actix_web::Result<HttpResponse> {
    let username = match id.identity() {
        Some(username) => username,
        None => return Ok(redirect("/login")),
    };
    let added = match accounts.add_to_list(&username, params.list, &params.title) {
        Ok(added) => added,
        Err(AccountError::InvalidCredentials) => {
            id.forget();
            return Ok(redirect("/login"));
        }
        Err(err) => return Err(log_error(err, "Database error")),
    };
    let message = match (added, params.list) {
        (false, _) => "already_listed",
        (true, ListKind::ToWatch) => "added_to_watch",
        (true, ListKind::Favorites) => "added_favorite",
    };
    Ok(redirect(&session::dashboard_location(
        &params.title,
        params.year,
        params.genre.as_deref(),
        message,
    )))
}

async fn login(query: QueryPairs, tera: Tera) -> actix_web::Result<HttpResponse> {
    let selections = session::Selections::from_pairs(&query);
    let mut ctx = tera::Context::new();
    ctx.insert("message", &selections.message);
    render(&tera, "login.html", &ctx)
}

#[derive(Deserialize)]
struct LoginParams {
    username: String,
    password: String,
}

fn account_failure(err: AccountError) -> actix_web::Result<HttpResponse> {
    if err.is_user_facing() {
        Ok(redirect(&format!("/login?message={}", err.code())))
    } else {
        Err(log_error(err, "Account error"))
    }
}

async fn login_post(
    params: web::Form<LoginParams>,
    id: Identity,
    accounts: AccountStore,
) -> actix_web::Result<HttpResponse> {
    match accounts.login(&params.username, &params.password) {
        Ok(user) => {
            id.remember(user.username);
            Ok(redirect("/"))
        }
        Err(err) => account_failure(err),
    }
}

async fn register_post(
    params: web::Form<LoginParams>,
    accounts: AccountStore,
) -> actix_web::Result<HttpResponse> {
    match accounts.register(&params.username, &params.password) {
        Ok(_) => Ok(redirect("/login?message=registered")),
        Err(err) => account_failure(err),
    }
}

async fn logout(id: Identity) -> actix_web::Result<HttpResponse> {
    id.forget();
    Ok(redirect("/login?message=logged_out"))
}

fn io_error<E: std::fmt::Display>(err: E) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "moviedash=debug,actix_web=info");
    }
    env_logger::init();

    let config = Config::from_env().map_err(io_error)?;
    let db = config.open_db().map_err(io_error)?;
    if let Some(path) = &config.catalog {
        catalog::import_file(&db, path).map_err(io_error)?;
    }
    let catalog = Arc::new(Catalog::load(&db).map_err(io_error)?);
    let title_index = TitleIndex::open(&db).map_err(io_error)?;
    let accounts = Accounts::new(db, config.bcrypt_cost);
    let tera = templates::load(&config.templates).map_err(io_error)?;
    let cookie_key = config.cookie_key.clone();

    info!("listening on {}", config.bind);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(IdentityService::new(
                CookieIdentityPolicy::new(&cookie_key)
                    .name("auth-cookie")
                    .secure(false),
            ))
            .data(tera.clone())
            .data(catalog.clone())
            .data(title_index.clone())
            .data(accounts.clone())
            .route("/", web::get().to(index))
            .route("/countries", web::get().to(countries))
            .route("/actors", web::get().to(actors))
            .route("/lists", web::post().to(add_to_list))
            .route("/login", web::get().to(login))
            .route("/login", web::post().to(login_post))
            .route("/register", web::post().to(register_post))
            .route("/logout", web::get().to(logout))
    })
    .bind(&config.bind)?
    .run()
    .await
}
